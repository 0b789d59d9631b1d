use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to sessions acting as 'admin':
/// the account listing and the platform-role mutation, both proxied to the
/// identity backend with the caller's credential.
///
/// Access Control:
/// The `/admin` prefix sits in the admin tier of the path policy, so the gate
/// already rejects every non-admin session role. Each handler re-checks the
/// resolved role before calling the backend, and the backend enforces its own
/// admin check as the third layer.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Lists every account with { sub, email, role }. Feeds the role
        // management screen.
        .route("/users", get(handlers::list_users))
        // PUT /admin/users/{sub}/role
        // Changes the target account's platform role. This is the only write
        // path to platform roles in the whole system.
        .route("/users/{sub}/role", put(handlers::update_user_role))
}
