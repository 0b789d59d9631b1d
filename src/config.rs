use std::env;

use crate::policy::PathPolicy;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is designed
/// to be immutable once loaded, ensuring consistency across all threads and
/// services (gate middleware, backend client, session store). It is pulled
/// into the application state via FromRef.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls feature activation (e.g., Dev Bypass,
    // in-memory vs. Postgres session store).
    pub env: Env,
    // Base URL of the identity backend (e.g. "http://localhost:8000/api").
    pub backend_url: String,
    // Per-request timeout for identity backend calls, in seconds. A timeout is
    // reported as upstream unavailability, never as permission.
    pub backend_timeout_secs: u64,
    // Secret key used to decode and validate incoming session JWTs (minted by
    // the external auth provider).
    pub jwt_secret: String,
    // Postgres connection string for the production session store. Unused in
    // Local, where sessions live in memory.
    pub db_url: Option<String>,
    // The ordered path-tier rule set (public / admin / teacher / student
    // prefixes plus the selection entry point).
    pub policy: PathPolicy,
    // Where a roleless-but-authenticated browser is redirected: the frontend's
    // role-selection screen.
    pub select_role_redirect: String,
}

/// Env
///
/// Defines the runtime context, used to switch between development utilities
/// (in-memory sessions, header bypass) and production infrastructure
/// (Postgres-backed sessions, hardened auth).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Reads a comma-separated path list from the environment, falling back to the
/// given defaults. Entries are trimmed; empty entries are dropped.
fn path_list(var: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => defaults.iter().map(|p| p.to_string()).collect(),
    }
}

impl PathPolicy {
    /// The default tier lists. Swagger and the health probe are public; the
    /// rest mirrors the path layout of the learning platform this gateway
    /// fronts. All of them can be overridden through the *_PATHS variables.
    pub fn default_policy() -> Self {
        PathPolicy {
            public: [
                "/",
                "/health",
                "/auth/login",
                "/auth/callback",
                "/auth/logout",
                "/select-role",
                "/swagger-ui",
                "/api-docs",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            admin: vec!["/admin".to_string()],
            teacher: vec!["/teacher".to_string(), "/courses/create".to_string()],
            student: vec!["/courses".to_string(), "/progress".to_string()],
            selection_entry: "/me/role".to_string(),
        }
    }

    /// Builds the policy from environment variables, keeping the defaults for
    /// anything unset.
    fn from_env() -> Self {
        let defaults = Self::default_policy();
        PathPolicy {
            public: path_list(
                "PUBLIC_PATHS",
                &defaults.public.iter().map(String::as_str).collect::<Vec<_>>(),
            ),
            admin: path_list(
                "ADMIN_PATHS",
                &defaults.admin.iter().map(String::as_str).collect::<Vec<_>>(),
            ),
            teacher: path_list(
                "TEACHER_PATHS",
                &defaults.teacher.iter().map(String::as_str).collect::<Vec<_>>(),
            ),
            student: path_list(
                "STUDENT_PATHS",
                &defaults.student.iter().map(String::as_str).collect::<Vec<_>>(),
            ),
            selection_entry: env::var("ROLE_SELECT_ENTRY")
                .unwrap_or(defaults.selection_entry),
        }
    }
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for
    /// test setup. This allows tests to instantiate the configuration without
    /// setting environment variables.
    fn default() -> Self {
        Self {
            env: Env::Local,
            backend_url: "http://localhost:8000/api".to_string(),
            backend_timeout_secs: 5,
            jwt_secret: "local-dev-session-secret".to_string(),
            db_url: None,
            policy: PathPolicy::default_policy(),
            select_role_redirect: "/select-role".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration
    /// at startup. It reads all parameters from environment variables and
    /// implements the **fail-fast** principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current
    /// runtime environment (especially Production) is not found. This prevents
    /// the gateway from starting with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // JWT Secret Resolution
        // The production secret is mandatory and must be explicitly set.
        let jwt_secret = match env {
            Env::Production => env::var("SESSION_JWT_SECRET")
                .expect("FATAL: SESSION_JWT_SECRET must be set in production."),
            // In local, we provide a fallback, though the developer should
            // ideally use the actual secret shared with the auth provider.
            _ => env::var("SESSION_JWT_SECRET")
                .unwrap_or_else(|_| "local-dev-session-secret".to_string()),
        };

        // The identity backend base URL is required in production; locally it
        // defaults to the dev backend.
        let backend_url = match env {
            Env::Production => env::var("IDENTITY_API_URL")
                .expect("FATAL: IDENTITY_API_URL required in prod"),
            _ => env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string()),
        };

        let backend_timeout_secs = env::var("IDENTITY_API_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(5);

        // Sessions are Postgres-backed in production only, so DATABASE_URL is
        // demanded only there.
        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
            ),
            _ => env::var("DATABASE_URL").ok(),
        };

        Self {
            env,
            backend_url,
            backend_timeout_secs,
            jwt_secret,
            db_url,
            policy: PathPolicy::from_env(),
            select_role_redirect: env::var("ROLE_SELECT_REDIRECT")
                .unwrap_or_else(|_| "/select-role".to_string()),
        }
    }
}
