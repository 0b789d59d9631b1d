use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::models::Role;

/// GateError
///
/// The complete set of outcomes the authorization gate can report for one
/// request. Every variant is scoped to a single request; none is fatal to the
/// process, and none is retried automatically.
#[derive(Debug, Error)]
pub enum GateError {
    /// No valid session identity on the request (missing, malformed or
    /// expired bearer token).
    #[error("not authenticated")]
    Unauthenticated,

    /// A role-assumption request asked for a role outside what the platform
    /// role permits. The session is left untouched.
    #[error("platform role '{platform}' may not act as '{requested}'")]
    RoleAssumptionDenied { platform: Role, requested: Role },

    /// The identity backend (or the session store) could not be reached or
    /// returned garbage. This is never interpreted as permission; the request
    /// fails instead of falling back to a default role.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Authenticated and resolved, but the session role is below the tier the
    /// requested path requires.
    #[error("session role does not grant access to this path")]
    PathForbidden,

    /// Authenticated, but no session role has been chosen yet. Surfaced as a
    /// redirect to the role-selection entry point, not as an error page.
    #[error("no session role selected")]
    SelectionRequired { location: String },

    /// The identity backend rejected a proxied admin operation. Its status is
    /// passed through to the caller unchanged.
    #[error("identity backend rejected the request with status {0}")]
    BackendRejected(StatusCode),
}

impl GateError {
    /// The HTTP status this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GateError::RoleAssumptionDenied { .. } => StatusCode::FORBIDDEN,
            GateError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            GateError::PathForbidden => StatusCode::FORBIDDEN,
            GateError::SelectionRequired { .. } => StatusCode::SEE_OTHER,
            GateError::BackendRejected(status) => *status,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            // Redirect semantics: the browser is sent to the selection screen
            // rather than shown an error body.
            GateError::SelectionRequired { location } => {
                Redirect::to(&location).into_response()
            }
            other => {
                let status = other.status();
                if status.is_server_error() {
                    tracing::error!(error = %other, "gate request failed");
                }
                (status, Json(serde_json::json!({ "error": other.to_string() })))
                    .into_response()
            }
        }
    }
}
