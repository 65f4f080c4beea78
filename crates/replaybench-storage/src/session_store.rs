// Database-backed SessionStore and StaleSessionCleanup implementations
//
// Benchmark sessions are rows in the app's session table. The cleanup removes
// every row created since the run started, which also catches sessions the
// target created for `new_session` requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use replaybench_core::{BenchError, Result, SessionData, SessionStore, StaleSessionCleanup};
use uuid::Uuid;

use crate::models::CreateSessionRow;
use crate::repositories::Database;

// ============================================================================
// PgSessionStore - Creates and deletes session rows
// ============================================================================

/// Postgres-backed session store
#[derive(Clone)]
pub struct PgSessionStore {
    db: Database,
}

impl PgSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create_session(&self, data: &SessionData) -> Result<String> {
        let data = serde_json::to_value(data)
            .map_err(|e| BenchError::store(format!("cannot encode session data: {}", e)))?;
        let row = self
            .db
            .create_session(CreateSessionRow {
                session_id: Uuid::now_v7().simple().to_string(),
                data,
            })
            .await
            .map_err(|e| BenchError::store(e.to_string()))?;

        Ok(row.session_id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let deleted = self
            .db
            .delete_session(session_id)
            .await
            .map_err(|e| BenchError::store(e.to_string()))?;

        if !deleted {
            return Err(BenchError::store(format!(
                "session {} does not exist in {}",
                session_id,
                self.db.table()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// PgStaleSessionCleanup - Purges rows created during the run
// ============================================================================

/// Deletes every session row created at or after `since`
#[derive(Clone)]
pub struct PgStaleSessionCleanup {
    db: Database,
    since: DateTime<Utc>,
}

impl PgStaleSessionCleanup {
    pub fn new(db: Database, since: DateTime<Utc>) -> Self {
        Self { db, since }
    }

    /// Cleanup for a run starting now, measured on the database clock
    pub async fn starting_now(db: Database) -> anyhow::Result<Self> {
        let since = db.current_time().await?;
        Ok(Self::new(db, since))
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }
}

#[async_trait]
impl StaleSessionCleanup for PgStaleSessionCleanup {
    async fn delete_stale_sessions(&self) -> Result<u64> {
        let removed = self
            .db
            .delete_sessions_created_since(self.since)
            .await
            .map_err(|e| BenchError::store(e.to_string()))?;

        tracing::debug!(
            table = %self.db.table(),
            since = %self.since,
            removed,
            "Purged sessions created during the run"
        );
        Ok(removed)
    }
}

// ============================================================================
// Factory functions
// ============================================================================

/// Connect, make sure the session table exists and build both collaborators
pub async fn connect(
    database_url: &str,
    table: Option<&str>,
) -> anyhow::Result<(PgSessionStore, PgStaleSessionCleanup)> {
    let mut db = Database::from_url(database_url).await?;
    if let Some(table) = table {
        db = db.with_table(table)?;
    }
    db.ensure_schema().await?;

    let cleanup = PgStaleSessionCleanup::starting_now(db.clone()).await?;
    Ok((PgSessionStore::new(db), cleanup))
}
