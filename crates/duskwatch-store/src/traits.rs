use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duskwatch_types::{Anomaly, AnalysisSession, LogRecord, LogRecordId, SessionId};

use crate::error::StoreResult;

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Persistence port for ingested `LogRecord`s.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, record: LogRecord) -> StoreResult<LogRecordId>;
    async fn get(&self, id: LogRecordId) -> StoreResult<Option<LogRecord>>;
    async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: QueryWindow,
    ) -> StoreResult<Vec<LogRecord>>;
    async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<usize>;
}

/// Persistence port for `Anomaly` records produced by a session.
#[async_trait]
pub trait AnomalyStore: Send + Sync {
    async fn save_anomalies(&self, session_id: SessionId, anomalies: Vec<Anomaly>) -> StoreResult<()>;
    async fn list_for_session(&self, session_id: SessionId) -> StoreResult<Vec<Anomaly>>;
    /// The `k` highest-scoring anomalies across every session, for export.
    async fn list_top(&self, k: usize) -> StoreResult<Vec<Anomaly>>;
}

/// Persistence port for `AnalysisSession` lifecycle state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: AnalysisSession) -> StoreResult<()>;
    async fn update(&self, session: AnalysisSession) -> StoreResult<()>;
    async fn get(&self, id: SessionId) -> StoreResult<Option<AnalysisSession>>;
}

/// Unified persistence bundle handed to the session manager.
pub trait AnalysisStore: LogStore + AnomalyStore + SessionStore + Send + Sync {}

impl<T> AnalysisStore for T where T: LogStore + AnomalyStore + SessionStore + Send + Sync {}
