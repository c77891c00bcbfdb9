//! SQLite snapshot repository implementation.
//!
//! Implements `SnapshotRepository` from `memora-core`. Absent identity parts
//! are stored as empty strings so the unique index treats them as equal (an
//! empty part reads back as absent), and
//! the upsert is one `INSERT .. ON CONFLICT .. RETURNING` statement.

use chrono::{DateTime, Utc};
use memora_core::snapshot::repository::SnapshotRepository;
use memora_types::error::RepositoryError;
use memora_types::snapshot::{NewSnapshot, ScopeType, Snapshot, SnapshotIdentity};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SnapshotRepository`.
#[derive(Clone)]
pub struct SqliteSnapshotRepository {
    pool: DatabasePool,
}

impl SqliteSnapshotRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SnapshotRow {
    id: String,
    agent_id: String,
    operation: String,
    user_id: String,
    scope_type: String,
    scope_id: String,
    source_hash: String,
    prompt_version: String,
    model: Option<String>,
    input: String,
    output: String,
    expires_at: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl SnapshotRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            agent_id: row.try_get("agent_id")?,
            operation: row.try_get("operation")?,
            user_id: row.try_get("user_id")?,
            scope_type: row.try_get("scope_type")?,
            scope_id: row.try_get("scope_id")?,
            source_hash: row.try_get("source_hash")?,
            prompt_version: row.try_get("prompt_version")?,
            model: row.try_get("model")?,
            input: row.try_get("input")?,
            output: row.try_get("output")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_snapshot(self) -> Result<Snapshot, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid snapshot id: {e}")))?;
        let scope_type = self
            .scope_type
            .parse::<ScopeType>()
            .map_err(RepositoryError::Query)?;

        Ok(Snapshot {
            id,
            identity: SnapshotIdentity {
                agent_id: self.agent_id,
                operation: from_column(self.operation),
                user_id: from_column(self.user_id),
                scope_type,
                scope_id: from_column(self.scope_id),
                source_hash: self.source_hash,
                prompt_version: self.prompt_version,
            },
            model: self.model,
            input: parse_json(&self.input, "input")?,
            output: parse_json(&self.output, "output")?,
            expires_at_ms: self.expires_at,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_column(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

fn from_column(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn parse_json(s: &str, column: &str) -> Result<serde_json::Value, RepositoryError> {
    serde_json::from_str(s).map_err(|e| RepositoryError::Query(format!("invalid JSON in {column}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// SnapshotRepository implementation
// ---------------------------------------------------------------------------

impl SnapshotRepository for SqliteSnapshotRepository {
    async fn find_by_identity(
        &self,
        identity: &SnapshotIdentity,
    ) -> Result<Option<Snapshot>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT * FROM agent_snapshots
               WHERE agent_id = ? AND operation = ? AND user_id = ? AND scope_type = ?
                 AND scope_id = ? AND source_hash = ? AND prompt_version = ?"#,
        )
        .bind(&identity.agent_id)
        .bind(to_column(identity.operation.as_deref()))
        .bind(to_column(identity.user_id.as_deref()))
        .bind(identity.scope_type.to_string())
        .bind(to_column(identity.scope_id.as_deref()))
        .bind(&identity.source_hash)
        .bind(&identity.prompt_version)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        match row {
            Some(row) => {
                let row = SnapshotRow::from_row(&row).map_err(query_error)?;
                Ok(Some(row.into_snapshot()?))
            }
            None => Ok(None),
        }
    }

    async fn upsert(
        &self,
        snapshot: &NewSnapshot,
        expires_at_ms: Option<i64>,
    ) -> Result<Snapshot, RepositoryError> {
        let identity = &snapshot.identity;
        let now = Utc::now().to_rfc3339();
        let input = serde_json::to_string(&snapshot.input)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize input: {e}")))?;
        let output = serde_json::to_string(&snapshot.output)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize output: {e}")))?;

        let row = sqlx::query(
            r#"INSERT INTO agent_snapshots
                 (id, agent_id, operation, user_id, scope_type, scope_id, source_hash,
                  prompt_version, model, input, output, expires_at, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (agent_id, operation, user_id, scope_type, scope_id, source_hash, prompt_version)
               DO UPDATE SET
                 model = excluded.model,
                 input = excluded.input,
                 output = excluded.output,
                 expires_at = excluded.expires_at,
                 updated_at = excluded.updated_at
               RETURNING *"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(&identity.agent_id)
        .bind(to_column(identity.operation.as_deref()))
        .bind(to_column(identity.user_id.as_deref()))
        .bind(identity.scope_type.to_string())
        .bind(to_column(identity.scope_id.as_deref()))
        .bind(&identity.source_hash)
        .bind(&identity.prompt_version)
        .bind(snapshot.model.as_deref())
        .bind(&input)
        .bind(&output)
        .bind(expires_at_ms)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(query_error)?;

        SnapshotRow::from_row(&row)
            .map_err(query_error)?
            .into_snapshot()
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM agent_snapshots WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_before(&self, now_ms: i64) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM agent_snapshots WHERE expires_at IS NOT NULL AND expires_at < ?",
        )
        .bind(now_ms)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;
        Ok(result.rows_affected())
    }
}
