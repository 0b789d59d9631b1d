use lms_gateway::{
    AppState, HttpIdentityBackend, MemorySessionStore, PgSessionStore,
    backend::BackendState,
    config::{AppConfig, Env},
    create_router,
    session::SessionState,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the gateway, responsible for initializing
/// all core components: Configuration, Logging, Session Store, Identity
/// Backend client, and the HTTP Server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() implements the fail-fast principle for missing
    // Production secrets.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Sets the default log level. It prioritizes the RUST_LOG environment
    // variable, falling back to sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lms_gateway=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // The structured logging format is dynamically selected based on APP_ENV.
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability during local
            // debugging.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON format output for ingestion by centralized log
            // aggregators. This is essential for monitoring.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);

    // 4. Session Store Initialization
    // Local development keeps sessions in memory; production requires the
    // Postgres-backed store so sessions survive instance restarts.
    let sessions: SessionState = match config.env {
        Env::Local => Arc::new(MemorySessionStore::new()),
        Env::Production => {
            let db_url = config
                .db_url
                .as_deref()
                .expect("FATAL: DATABASE_URL required in prod");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let store = PgSessionStore::new(pool);
            store
                .ensure_schema()
                .await
                .expect("FATAL: Failed to prepare session table.");
            Arc::new(store)
        }
    };

    // 5. Identity Backend Initialization
    // The client used for the per-request platform-role read and the proxied
    // admin operations.
    let backend: BackendState = Arc::new(HttpIdentityBackend::new(
        &config.backend_url,
        Duration::from_secs(config.backend_timeout_secs),
    ));

    // 6. Unified State Assembly
    let app_state = AppState {
        sessions,
        backend,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    // Binds the TCP listener and initiates the HTTP server.
    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    // The long-running Axum server process.
    axum::serve(listener, app).await.unwrap();
}
