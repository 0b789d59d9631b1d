use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any
/// client. The gate skips these paths entirely (they are in the public prefix
/// list), so nothing here may reveal identity or role data.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks. Returns "ok" immediately to verify the service is
        // running and responsive.
        .route("/health", get(|| async { "ok" }))
}
