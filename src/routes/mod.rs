/// Router Module Index
///
/// Organizes the gateway's routing logic into security-segregated modules.
/// The gate middleware in lib.rs enforces the path tiers globally; the split
/// here keeps each handler next to the access class it belongs to, so the
/// second (in-handler) authorization layer is easy to audit.

/// Routes reachable with no authentication (health probe).
pub mod public;

/// Routes for any authenticated session: profile, role selection, logout.
pub mod authenticated;

/// Routes restricted to sessions acting as 'admin'.
pub mod admin;
