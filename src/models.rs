use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Role Model ---

/// Role
///
/// The closed set of privilege levels on the platform. The same enumeration is
/// used for both meanings of "role":
///
/// - **Platform role**: the durable, backend-authoritative privilege level of
///   an account. Changed only through the admin management endpoint.
/// - **Session role**: the transient role a user is currently acting as,
///   scoped to one login session and never exceeding what the platform role
///   permits.
///
/// Keeping this a closed enum (rather than a free-form string) means an
/// unknown or misspelled role fails at the parse boundary instead of silently
/// falling through to some default privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    /// can_assume
    ///
    /// The role-assumption rule table. Decides whether an account whose
    /// platform role is `self` may act as `requested` for the current session.
    ///
    /// | platform | permitted requested set |
    /// |----------|----------------------------|
    /// | admin    | admin, teacher, student    |
    /// | teacher  | teacher, student           |
    /// | student  | student                    |
    ///
    /// The match is exhaustive over the enum, so there is no fallthrough case
    /// to get wrong.
    pub fn can_assume(self, requested: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::Teacher => matches!(requested, Role::Teacher | Role::Student),
            Role::Student => requested == Role::Student,
        }
    }

    /// assumable_roles
    ///
    /// The full permitted set from the rule table, in descending privilege
    /// order. Drives the role-selection screen on the frontend.
    pub fn assumable_roles(self) -> &'static [Role] {
        match self {
            Role::Admin => &[Role::Admin, Role::Teacher, Role::Student],
            Role::Teacher => &[Role::Teacher, Role::Student],
            Role::Student => &[Role::Student],
        }
    }

    /// The lowercase wire string for this role, matching the backend and the
    /// JSON representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string from an external source (backend row,
/// session row, header) is not one of the three known roles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized role: {0:?}")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

// --- Session State ---

/// SessionRecord
///
/// The explicit session-keyed record of a completed role assumption. Stored in
/// the session store under the session id, survives across requests within one
/// login session, and is removed at logout.
///
/// `platform_role` is the ceiling that was in force when the assumption was
/// validated. The gate re-checks the stored `session_role` against a freshly
/// fetched platform role on every request, so a record that has gone stale
/// (the account was demoted after assuming) is discarded rather than honored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub platform_role: Role,
    pub session_role: Role,
    pub assumed_at: DateTime<Utc>,
}

// --- Backend Schemas ---

/// BackendUser
///
/// One account as reported by the identity backend. Returned by
/// `GET /users/me` (the caller's own record), `GET /users` (admin listing) and
/// `PUT /users/{sub}/role` (after an admin mutation).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BackendUser {
    /// Opaque subject identifier issued by the external auth provider.
    pub sub: String,
    pub email: String,
    /// The platform role. This is the authoritative value; anything cached in
    /// a session is at most a downgrade of it.
    pub role: Role,
}

// --- Request Payloads (Input Schemas) ---

/// AssumeRoleRequest
///
/// Input payload for `POST /me/role`. An unknown role string is rejected at
/// deserialization, before the rule table is even consulted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssumeRoleRequest {
    pub role: Role,
}

/// UpdateRoleRequest
///
/// Input payload for the admin platform-role mutation,
/// `PUT /admin/users/{sub}/role`. Forwarded to the identity backend.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

// --- Profile & Selection Schemas (Output) ---

/// UserProfile
///
/// Output schema for `GET /me`: the effective identity of the caller after
/// role resolution.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub sub: String,
    pub email: String,
    /// The backend-authoritative privilege ceiling.
    pub platform_role: Role,
    /// The role the caller is currently acting as.
    pub session_role: Role,
    // Dynamic URL for a profile image/avatar.
    pub avatar_url: Option<String>,
}

/// SessionRoleResponse
///
/// Output schema for the role-selection endpoints (`GET /me/role` and the
/// response of a successful `POST /me/role`). `available_roles` is the
/// rule-table row for the caller's platform role, so the selection screen
/// never offers a role the validator would reject.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionRoleResponse {
    pub platform_role: Role,
    pub session_role: Role,
    pub available_roles: Vec<Role>,
}
