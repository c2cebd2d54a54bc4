//! SQLite adapter for the persistence ports.
//!
//! Chosen over a client/server database because this system deploys to a
//! single air-gapped host with no server process to manage; SQLite gives
//! the same transactional guarantees without a client/server round trip.
//! Trait surfaces are identical either way.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duskwatch_types::{Anomaly, AnalysisSession, LogRecord, LogRecordId, SessionId};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::{StoreError, StoreResult};
use crate::traits::{AnomalyStore, LogStore, QueryWindow, SessionStore};

/// SQLite-backed persistence adapter.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to connect sqlite: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS logs (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                record_json TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                session_json TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS anomalies (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                anomaly_json TEXT NOT NULL
            )
            "#,
        ];
        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl LogStore for SqliteStore {
    async fn append(&self, record: LogRecord) -> StoreResult<LogRecordId> {
        let id = record.id;
        let record_json =
            serde_json::to_string(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query("INSERT INTO logs (id, timestamp, record_json) VALUES ($1, $2, $3)")
            .bind(id.0.to_string())
            .bind(record.timestamp.to_rfc3339())
            .bind(record_json)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(id)
    }

    async fn get(&self, id: LogRecordId) -> StoreResult<Option<LogRecord>> {
        let row = sqlx::query("SELECT record_json FROM logs WHERE id = $1")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.map(|r| decode_row(&r, "record_json")).transpose()
    }

    async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: QueryWindow,
    ) -> StoreResult<Vec<LogRecord>> {
        let limit = if window.limit == 0 { i64::MAX } else { window.limit as i64 };
        let rows = sqlx::query(
            "SELECT record_json FROM logs WHERE timestamp >= $1 AND timestamp <= $2 \
             ORDER BY timestamp ASC LIMIT $3 OFFSET $4",
        )
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .bind(limit)
        .bind(window.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(|r| decode_row(r, "record_json")).collect()
    }

    async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM logs WHERE timestamp >= $1 AND timestamp <= $2")
            .bind(start.to_rfc3339())
            .bind(end.to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let count: i64 = row.try_get("count").map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl AnomalyStore for SqliteStore {
    async fn save_anomalies(&self, session_id: SessionId, anomalies: Vec<Anomaly>) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        for anomaly in anomalies {
            let anomaly_json =
                serde_json::to_string(&anomaly).map_err(|e| StoreError::Serialization(e.to_string()))?;
            sqlx::query("INSERT INTO anomalies (id, session_id, anomaly_json) VALUES ($1, $2, $3)")
                .bind(anomaly.id.0.to_string())
                .bind(session_id.0.to_string())
                .bind(anomaly_json)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn list_for_session(&self, session_id: SessionId) -> StoreResult<Vec<Anomaly>> {
        let rows = sqlx::query("SELECT anomaly_json FROM anomalies WHERE session_id = $1")
            .bind(session_id.0.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(|r| decode_row(r, "anomaly_json")).collect()
    }

    async fn list_top(&self, k: usize) -> StoreResult<Vec<Anomaly>> {
        let rows = sqlx::query(
            "SELECT anomaly_json FROM anomalies \
             ORDER BY json_extract(anomaly_json, '$.score') DESC LIMIT $1",
        )
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(|r| decode_row(r, "anomaly_json")).collect()
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create(&self, session: AnalysisSession) -> StoreResult<()> {
        let session_json =
            serde_json::to_string(&session).map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query("INSERT INTO sessions (session_id, session_json) VALUES ($1, $2)")
            .bind(session.session_id.0.to_string())
            .bind(session_json)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Conflict(e.to_string()))?;
        Ok(())
    }

    async fn update(&self, session: AnalysisSession) -> StoreResult<()> {
        let session_json =
            serde_json::to_string(&session).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let result = sqlx::query("UPDATE sessions SET session_json = $1 WHERE session_id = $2")
            .bind(session_json)
            .bind(session.session_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("session {} not found", session.session_id)));
        }
        Ok(())
    }

    async fn get(&self, id: SessionId) -> StoreResult<Option<AnalysisSession>> {
        let row = sqlx::query("SELECT session_json FROM sessions WHERE session_id = $1")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.map(|r| decode_row(&r, "session_json")).transpose()
    }
}

fn decode_row<T: serde::de::DeserializeOwned>(row: &sqlx::sqlite::SqliteRow, column: &str) -> StoreResult<T> {
    let raw: String = row
        .try_get(column)
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(e.to_string()))
}
