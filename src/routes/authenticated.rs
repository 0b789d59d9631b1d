use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has successfully passed the
/// gate's authentication step. This module implements the session side of the
/// role model: reading the resolved identity, selecting a session role, and
/// ending the session.
///
/// Access Control Strategy:
/// The gate middleware runs before every handler here. `/me` additionally
/// requires a selected session role (tier rule 2); `/me/role` is the selection
/// entry point and stays reachable while roleless; `/auth/logout` is listed as
/// a public path so a roleless session can still log out, which is why its
/// handler authenticates through the `AuthUser` extractor itself.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Retrieves the currently authenticated user's resolved profile:
        // subject, email, platform role and acting session role.
        .route("/me", get(handlers::get_me))
        // GET/POST /me/role
        // The role-selection entry point. GET reports the current pair plus
        // the assumable set; POST validates and performs the assumption.
        .route(
            "/me/role",
            get(handlers::get_session_role).post(handlers::assume_role),
        )
        // POST /auth/logout
        // Clears the session's role record. The next request with this
        // session is treated as roleless and redirected to selection.
        .route("/auth/logout", post(handlers::logout))
}
