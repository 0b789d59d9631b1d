use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::GateError;
use crate::models::{Role, SessionRecord};

// 1. SessionStore Contract

/// SessionStore
///
/// Defines the abstract contract for reading and writing the session-keyed
/// role record. This trait allows us to swap the concrete implementation, from
/// the Postgres-backed store in production to the in-memory store during local
/// development and testing, without affecting the gate or the handlers.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn SessionStore>`) safely shareable across Axum's asynchronous task
/// boundaries.
///
/// Every operation touches exactly one session's record, so no cross-session
/// coordination is needed; two sessions can never race on the same key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads the role record for a session, if one has been written.
    async fn get(&self, session_id: Uuid) -> Result<Option<SessionRecord>, GateError>;

    /// Writes (or replaces) the role record for a session. Called only after
    /// the role-assumption validator has approved the record's contents.
    async fn put(&self, session_id: Uuid, record: SessionRecord) -> Result<(), GateError>;

    /// Removes the role record for a session. Called at logout and when a
    /// stored record no longer fits the account's platform role. Clearing an
    /// absent record is not an error.
    async fn clear(&self, session_id: Uuid) -> Result<(), GateError>;
}

/// SessionState
///
/// The concrete type used to share session store access across the application
/// state.
pub type SessionState = Arc<dyn SessionStore>;

// 2. In-Memory Implementation (Local / Tests)

/// MemorySessionStore
///
/// Keeps session records in a process-local map. The store of choice in
/// `Env::Local` and in tests; a multi-instance production deployment needs the
/// Postgres store instead, since sessions must survive across requests that
/// may land on different instances.
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: Uuid) -> Result<Option<SessionRecord>, GateError> {
        Ok(self.records.read().await.get(&session_id).cloned())
    }

    async fn put(&self, session_id: Uuid, record: SessionRecord) -> Result<(), GateError> {
        self.records.write().await.insert(session_id, record);
        Ok(())
    }

    async fn clear(&self, session_id: Uuid) -> Result<(), GateError> {
        self.records.write().await.remove(&session_id);
        Ok(())
    }
}

// 3. Postgres Implementation (Production)

/// Raw database row for a session record. Roles are stored as their lowercase
/// wire strings and parsed back through the closed enum on read.
#[derive(sqlx::FromRow)]
struct SessionRow {
    platform_role: String,
    session_role: String,
    assumed_at: chrono::DateTime<chrono::Utc>,
}

impl SessionRow {
    fn into_record(self) -> Result<SessionRecord, GateError> {
        // A row that fails to parse means the table was written by something
        // other than the validator. Refuse it rather than guessing a role.
        let platform_role = Role::from_str(&self.platform_role)
            .map_err(|e| GateError::UpstreamUnavailable(format!("corrupt session row: {e}")))?;
        let session_role = Role::from_str(&self.session_role)
            .map_err(|e| GateError::UpstreamUnavailable(format!("corrupt session row: {e}")))?;
        Ok(SessionRecord {
            platform_role,
            session_role,
            assumed_at: self.assumed_at,
        })
    }
}

/// PgSessionStore
///
/// The concrete implementation of the `SessionStore` trait backed by the
/// PostgreSQL database, for deployments where gateway instances come and go
/// but login sessions must not.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new store instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_schema
    ///
    /// Creates the session table if it does not exist yet. Idempotent, safe to
    /// call at every startup.
    pub async fn ensure_schema(&self) -> Result<(), GateError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_roles (
                session_id UUID PRIMARY KEY,
                platform_role TEXT NOT NULL,
                session_role TEXT NOT NULL,
                assumed_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| GateError::UpstreamUnavailable(format!("session store: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, session_id: Uuid) -> Result<Option<SessionRecord>, GateError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT platform_role, session_role, assumed_at FROM session_roles WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("session get error: {:?}", e);
            GateError::UpstreamUnavailable(format!("session store: {e}"))
        })?;

        row.map(SessionRow::into_record).transpose()
    }

    async fn put(&self, session_id: Uuid, record: SessionRecord) -> Result<(), GateError> {
        sqlx::query(
            r#"
            INSERT INTO session_roles (session_id, platform_role, session_role, assumed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id) DO UPDATE
            SET platform_role = EXCLUDED.platform_role,
                session_role = EXCLUDED.session_role,
                assumed_at = EXCLUDED.assumed_at
            "#,
        )
        .bind(session_id)
        .bind(record.platform_role.as_str())
        .bind(record.session_role.as_str())
        .bind(record.assumed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("session put error: {:?}", e);
            GateError::UpstreamUnavailable(format!("session store: {e}"))
        })?;
        Ok(())
    }

    async fn clear(&self, session_id: Uuid) -> Result<(), GateError> {
        sqlx::query("DELETE FROM session_roles WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("session clear error: {:?}", e);
                GateError::UpstreamUnavailable(format!("session store: {e}"))
            })?;
        Ok(())
    }
}
