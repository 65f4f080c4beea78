// Repository layer for benchmark session rows

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::*;

/// Table used when none is configured
pub const DEFAULT_SESSION_TABLE: &str = "sessions";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    table: String,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: DEFAULT_SESSION_TABLE.to_string(),
        }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Point the repository at another session table
    ///
    /// The name is interpolated into SQL, so only `[A-Za-z0-9_.]` is accepted.
    pub fn with_table(mut self, table: impl Into<String>) -> Result<Self> {
        self.table = validate_table_name(table.into())?;
        Ok(self)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    // ============================================
    // Schema
    // ============================================

    /// Create the session table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&create_table_sql(&self.table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Current time on the database server, the clock `created_at` is stamped with
    pub async fn current_time(&self) -> Result<DateTime<Utc>> {
        let now = sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }

    // ============================================
    // Sessions
    // ============================================

    pub async fn create_session(&self, input: CreateSessionRow) -> Result<SessionRow> {
        let sql = format!(
            r#"
            INSERT INTO {} (session_id, data, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            RETURNING session_id, data, created_at, updated_at
            "#,
            self.table
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(&input.session_id)
            .bind(&input.data)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let sql = format!(
            r#"
            SELECT session_id, data, created_at, updated_at
            FROM {}
            WHERE session_id = $1
            "#,
            self.table
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE session_id = $1", self.table);
        let result = sqlx::query(&sql)
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every session created at or after `since`
    pub async fn delete_sessions_created_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE created_at >= $1", self.table);
        let result = sqlx::query(&sql).bind(since).execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}

fn validate_table_name(table: String) -> Result<String> {
    let valid = !table.is_empty()
        && !table.starts_with('.')
        && !table.ends_with('.')
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !valid {
        bail!("invalid session table name: {:?}", table);
    }
    Ok(table)
}

fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            session_id TEXT PRIMARY KEY,
            data JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert_eq!(validate_table_name("sessions".into()).unwrap(), "sessions");
        assert_eq!(
            validate_table_name("bench.sessions_v2".into()).unwrap(),
            "bench.sessions_v2"
        );
        assert!(validate_table_name("".into()).is_err());
        assert!(validate_table_name(".sessions".into()).is_err());
        assert!(validate_table_name("sessions; DROP TABLE users".into()).is_err());
        assert!(validate_table_name("\"sessions\"".into()).is_err());
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("bench_sessions");
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS bench_sessions ("));
        assert!(sql.contains("DEFAULT '{}'::jsonb"));
        assert!(sql.contains("created_at TIMESTAMPTZ"));
    }
}
