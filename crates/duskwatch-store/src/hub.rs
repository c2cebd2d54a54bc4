//! Hub-side persistence port: the multi-node aggregation tables a hub
//! node writes to on package import, kept apart from the per-node
//! `LogStore`/`AnomalyStore`/`SessionStore` bundle since a terminal node
//! never touches them.

use async_trait::async_trait;
use duskwatch_types::{HubAnomaly, NodeId, NodeRecord, SyncLogEntry, TechniqueCorrelation};

use crate::error::StoreResult;

#[async_trait]
pub trait HubStore: Send + Sync {
    async fn upsert_node(&self, node: NodeRecord) -> StoreResult<()>;

    /// Insert a `HubAnomaly`, keyed by `(original_id, source_node)`.
    /// Returns `true` if inserted, `false` if it was already present.
    async fn insert_hub_anomaly(&self, anomaly: HubAnomaly) -> StoreResult<bool>;

    async fn record_sync_log(&self, entry: SyncLogEntry) -> StoreResult<()>;

    /// Rows for techniques observed on at least two distinct source nodes.
    async fn correlate_techniques(&self) -> StoreResult<Vec<TechniqueCorrelation>>;
}
