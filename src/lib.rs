use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod backend;
pub mod config;
pub mod errors;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod session;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point (main.rs).
pub use backend::{BackendState, HttpIdentityBackend, MockIdentityBackend};
pub use config::AppConfig;
pub use session::{MemorySessionStore, PgSessionStore, SessionState};

/// ApiDoc
///
/// This struct auto-generates the OpenAPI documentation (Swagger JSON) for the
/// gateway. It aggregates all API paths and data schemas that have been
/// decorated with the `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]`
/// macros. The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::get_me, handlers::get_session_role, handlers::assume_role,
        handlers::logout, handlers::list_users, handlers::update_user_role
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::Role, models::BackendUser, models::UserProfile,
            models::SessionRoleResponse, models::AssumeRoleRequest,
            models::UpdateRoleRequest,
        )
    ),
    tags(
        (name = "lms-gateway", description = "Session Authorization Gateway API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe,
/// and immutable container holding all essential application services and
/// configuration. The application state is shared across all incoming
/// requests.
#[derive(Clone)]
pub struct AppState {
    /// Session Layer: the store holding each login session's role record.
    pub sessions: SessionState,
    /// Identity Layer: the client for the role backend (source of truth for
    /// platform roles).
    pub backend: BackendState,
    /// Configuration: the loaded, immutable environment configuration,
    /// including the path-tier policy.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow handlers and the extractor to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for BackendState {
    fn from_ref(app_state: &AppState) -> BackendState {
        app_state.backend.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the gateway's entire routing structure, applies the gate and the
/// global middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI. The swagger
        // paths are in the public prefix list, so the gate lets them through.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))

        // Public Routes: health probe.
        .merge(public::public_routes())

        // Authenticated Routes: profile, role selection, logout.
        .merge(authenticated::authenticated_routes())

        // Admin Routes: nested under '/admin', which the default path policy
        // places in the admin tier.
        .nest("/admin", admin::admin_routes())

        // The Session Authorization Gate. Applied to every route above; the
        // policy's public list decides which paths skip authentication, so no
        // route can be exposed by forgetting a per-route layer.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::gate_middleware,
        ))

        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming
                // request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in
                // a tracing span that carries the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns the generated
                // x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper function used by `TraceLayer` to customize the tracing span
/// creation. It extracts the `x-request-id` header (if present) and includes
/// it in the structured logging metadata alongside the HTTP method and URI.
///
/// *Goal*: Ensure every log line for a single request is correlated by a
/// unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    // The structured log format used by the tracing macros.
    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
