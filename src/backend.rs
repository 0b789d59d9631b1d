use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::GateError;
use crate::models::{BackendUser, Role};

// 1. IdentityBackend Contract

/// IdentityBackend
///
/// Defines the abstract contract for all interactions with the identity/role
/// backend. The backend is the source of truth for platform roles; this
/// gateway only ever reads them, except for the admin mutation which it
/// forwards verbatim. The trait allows us to swap the HTTP client for the
/// in-memory Mock (MockIdentityBackend) during testing without affecting the
/// gate or the handlers.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// `GET /users/me`: the caller's own account record, resolved from the
    /// bearer credential. This is the platform-role read the gate performs on
    /// every non-public request.
    async fn fetch_profile(&self, bearer: &str) -> Result<BackendUser, GateError>;

    /// `GET /users`: the full account listing. The backend enforces that the
    /// credential belongs to an admin; the gateway checks the session role
    /// first so a teacher acting as student never even reaches the backend.
    async fn list_users(&self, bearer: &str) -> Result<Vec<BackendUser>, GateError>;

    /// `PUT /users/{sub}/role`: the admin-only platform-role mutation. The
    /// only write path to role data anywhere in the system.
    async fn update_platform_role(
        &self,
        bearer: &str,
        sub: &str,
        role: Role,
    ) -> Result<BackendUser, GateError>;
}

/// BackendState
///
/// The concrete type used to share identity backend access across the
/// application state.
pub type BackendState = Arc<dyn IdentityBackend>;

// 2. The Real Implementation (HTTP)

/// HttpIdentityBackend
///
/// The concrete implementation using a reqwest client against the configured
/// base URL. Every call carries the caller's bearer credential and the
/// configured timeout; a timeout or connection failure surfaces as
/// `UpstreamUnavailable`, never as permission.
#[derive(Clone)]
pub struct HttpIdentityBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityBackend {
    /// new
    ///
    /// Constructs the client from the configured base URL and timeout.
    ///
    /// # Panics
    /// Panics if the underlying TLS/client setup fails, which is a startup
    ///-time configuration problem and follows the fail-fast principle.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("FATAL: failed to construct identity backend HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Maps a non-success status from a proxied admin call. The backend's own
    /// rejection statuses pass through so the frontend sees what the backend
    /// decided; 5xx collapses into unavailability.
    fn map_admin_status(status: StatusCode) -> GateError {
        match status {
            StatusCode::UNAUTHORIZED => GateError::Unauthenticated,
            StatusCode::FORBIDDEN => GateError::PathForbidden,
            s if s.is_server_error() => {
                GateError::UpstreamUnavailable(format!("identity service returned {s}"))
            }
            s => GateError::BackendRejected(s),
        }
    }
}

#[async_trait]
impl IdentityBackend for HttpIdentityBackend {
    async fn fetch_profile(&self, bearer: &str) -> Result<BackendUser, GateError> {
        let response = self
            .client
            .get(format!("{}/users/me", self.base_url))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| GateError::UpstreamUnavailable(e.to_string()))?;

        match response.status() {
            s if s.is_success() => response
                .json::<BackendUser>()
                .await
                .map_err(|e| GateError::UpstreamUnavailable(format!("bad profile body: {e}"))),
            // The backend does not recognize the credential: the session is
            // not authenticated as far as role data is concerned.
            StatusCode::UNAUTHORIZED => Err(GateError::Unauthenticated),
            // Anything else (including backend 5xx) is unavailability. The
            // resolution fails; no role is ever assumed as a default.
            s => Err(GateError::UpstreamUnavailable(format!(
                "identity service returned {s}"
            ))),
        }
    }

    async fn list_users(&self, bearer: &str) -> Result<Vec<BackendUser>, GateError> {
        let response = self
            .client
            .get(format!("{}/users", self.base_url))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| GateError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::map_admin_status(status));
        }

        response
            .json::<Vec<BackendUser>>()
            .await
            .map_err(|e| GateError::UpstreamUnavailable(format!("bad listing body: {e}")))
    }

    async fn update_platform_role(
        &self,
        bearer: &str,
        sub: &str,
        role: Role,
    ) -> Result<BackendUser, GateError> {
        let response = self
            .client
            .put(format!("{}/users/{}/role", self.base_url, sub))
            .bearer_auth(bearer)
            .json(&serde_json::json!({ "role": role }))
            .send()
            .await
            .map_err(|e| GateError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::map_admin_status(status));
        }

        response
            .json::<BackendUser>()
            .await
            .map_err(|e| GateError::UpstreamUnavailable(format!("bad user body: {e}")))
    }
}

// 3. The Mock Implementation (For Unit Tests)

/// MockIdentityBackend
///
/// A mock implementation of `IdentityBackend` used exclusively for unit and
/// integration testing. This allows testing the gate and handler logic without
/// a network connection to the identity service, isolating the test boundary.
#[derive(Clone, Default)]
pub struct MockIdentityBackend {
    /// The account returned for any bearer credential. None simulates a
    /// credential the backend does not recognize.
    pub profile: Option<BackendUser>,
    /// The listing returned to admins.
    pub users: Vec<BackendUser>,
    /// When true, all operations return a simulated outage.
    pub should_fail: bool,
}

impl MockIdentityBackend {
    pub fn new(profile: BackendUser) -> Self {
        Self {
            profile: Some(profile),
            users: vec![],
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            profile: None,
            users: vec![],
            should_fail: true,
        }
    }
}

#[async_trait]
impl IdentityBackend for MockIdentityBackend {
    async fn fetch_profile(&self, _bearer: &str) -> Result<BackendUser, GateError> {
        if self.should_fail {
            return Err(GateError::UpstreamUnavailable(
                "mock outage: simulation requested".to_string(),
            ));
        }
        self.profile.clone().ok_or(GateError::Unauthenticated)
    }

    async fn list_users(&self, _bearer: &str) -> Result<Vec<BackendUser>, GateError> {
        if self.should_fail {
            return Err(GateError::UpstreamUnavailable(
                "mock outage: simulation requested".to_string(),
            ));
        }
        Ok(self.users.clone())
    }

    async fn update_platform_role(
        &self,
        _bearer: &str,
        sub: &str,
        role: Role,
    ) -> Result<BackendUser, GateError> {
        if self.should_fail {
            return Err(GateError::UpstreamUnavailable(
                "mock outage: simulation requested".to_string(),
            ));
        }
        // Echo the mutation back the way the real backend does, using the
        // listing entry when one matches.
        let email = self
            .users
            .iter()
            .find(|u| u.sub == sub)
            .map(|u| u.email.clone())
            .unwrap_or_else(|| format!("{sub}@mock.test"));
        Ok(BackendUser {
            sub: sub.to_string(),
            email,
            role,
        })
    }
}
