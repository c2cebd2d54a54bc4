//! In-memory reference adapter for the persistence ports. Deterministic and
//! test-friendly; production deployments use the `sqlite` adapter.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duskwatch_types::{
    Anomaly, AnalysisSession, HubAnomaly, LogRecord, LogRecordId, NodeId, NodeRecord,
    SessionId, SyncLogEntry, TechniqueCorrelation, ThreatLevel,
};

use crate::error::{StoreError, StoreResult};
use crate::hub::HubStore;
use crate::traits::{AnomalyStore, LogStore, QueryWindow, SessionStore};

#[derive(Default)]
pub struct InMemoryStore {
    logs: RwLock<HashMap<LogRecordId, LogRecord>>,
    anomalies: RwLock<HashMap<SessionId, Vec<Anomaly>>>,
    sessions: RwLock<HashMap<SessionId, AnalysisSession>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for InMemoryStore {
    async fn append(&self, record: LogRecord) -> StoreResult<LogRecordId> {
        let mut guard = self
            .logs
            .write()
            .map_err(|_| StoreError::Backend("log store lock poisoned".to_string()))?;
        let id = record.id;
        guard.insert(id, record);
        Ok(id)
    }

    async fn get(&self, id: LogRecordId) -> StoreResult<Option<LogRecord>> {
        let guard = self
            .logs
            .read()
            .map_err(|_| StoreError::Backend("log store lock poisoned".to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: QueryWindow,
    ) -> StoreResult<Vec<LogRecord>> {
        let guard = self
            .logs
            .read()
            .map_err(|_| StoreError::Backend("log store lock poisoned".to_string()))?;
        let mut values: Vec<LogRecord> = guard
            .values()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect();
        values.sort_by_key(|r| r.timestamp);
        Ok(apply_window(values, window))
    }

    async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<usize> {
        let guard = self
            .logs
            .read()
            .map_err(|_| StoreError::Backend("log store lock poisoned".to_string()))?;
        Ok(guard
            .values()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .count())
    }
}

#[async_trait]
impl AnomalyStore for InMemoryStore {
    async fn save_anomalies(&self, session_id: SessionId, anomalies: Vec<Anomaly>) -> StoreResult<()> {
        let mut guard = self
            .anomalies
            .write()
            .map_err(|_| StoreError::Backend("anomaly store lock poisoned".to_string()))?;
        guard.entry(session_id).or_default().extend(anomalies);
        Ok(())
    }

    async fn list_for_session(&self, session_id: SessionId) -> StoreResult<Vec<Anomaly>> {
        let guard = self
            .anomalies
            .read()
            .map_err(|_| StoreError::Backend("anomaly store lock poisoned".to_string()))?;
        Ok(guard.get(&session_id).cloned().unwrap_or_default())
    }

    async fn list_top(&self, k: usize) -> StoreResult<Vec<Anomaly>> {
        let guard = self
            .anomalies
            .read()
            .map_err(|_| StoreError::Backend("anomaly store lock poisoned".to_string()))?;
        let mut all: Vec<Anomaly> = guard.values().flatten().cloned().collect();
        all.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        all.truncate(k);
        Ok(all)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create(&self, session: AnalysisSession) -> StoreResult<()> {
        let mut guard = self
            .sessions
            .write()
            .map_err(|_| StoreError::Backend("session store lock poisoned".to_string()))?;
        if guard.contains_key(&session.session_id) {
            return Err(StoreError::Conflict(format!(
                "session {} already exists",
                session.session_id
            )));
        }
        guard.insert(session.session_id, session);
        Ok(())
    }

    async fn update(&self, session: AnalysisSession) -> StoreResult<()> {
        let mut guard = self
            .sessions
            .write()
            .map_err(|_| StoreError::Backend("session store lock poisoned".to_string()))?;
        if !guard.contains_key(&session.session_id) {
            return Err(StoreError::NotFound(format!("session {} not found", session.session_id)));
        }
        guard.insert(session.session_id, session);
        Ok(())
    }

    async fn get(&self, id: SessionId) -> StoreResult<Option<AnalysisSession>> {
        let guard = self
            .sessions
            .read()
            .map_err(|_| StoreError::Backend("session store lock poisoned".to_string()))?;
        Ok(guard.get(&id).cloned())
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}


/// In-memory hub-side store: node registry, imported `HubAnomaly` rows,
/// and the sync log, keyed the same way the real schema is.
#[derive(Default)]
pub struct InMemoryHubStore {
    nodes: RwLock<HashMap<NodeId, NodeRecord>>,
    seen_keys: RwLock<HashSet<(duskwatch_types::AnomalyId, NodeId)>>,
    anomalies: RwLock<Vec<HubAnomaly>>,
    sync_log: RwLock<Vec<SyncLogEntry>>,
}

impl InMemoryHubStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HubStore for InMemoryHubStore {
    async fn upsert_node(&self, node: NodeRecord) -> StoreResult<()> {
        let mut guard = self
            .nodes
            .write()
            .map_err(|_| StoreError::Backend("node registry lock poisoned".to_string()))?;
        guard.insert(node.node_id, node);
        Ok(())
    }

    async fn insert_hub_anomaly(&self, anomaly: HubAnomaly) -> StoreResult<bool> {
        let key = (anomaly.original_id, anomaly.source_node);
        let mut seen = self
            .seen_keys
            .write()
            .map_err(|_| StoreError::Backend("hub anomaly lock poisoned".to_string()))?;
        if !seen.insert(key) {
            return Ok(false);
        }
        let mut guard = self
            .anomalies
            .write()
            .map_err(|_| StoreError::Backend("hub anomaly lock poisoned".to_string()))?;
        guard.push(anomaly);
        Ok(true)
    }

    async fn record_sync_log(&self, entry: SyncLogEntry) -> StoreResult<()> {
        let mut guard = self
            .sync_log
            .write()
            .map_err(|_| StoreError::Backend("sync log lock poisoned".to_string()))?;
        guard.push(entry);
        Ok(())
    }

    async fn correlate_techniques(&self) -> StoreResult<Vec<TechniqueCorrelation>> {
        let guard = self
            .anomalies
            .read()
            .map_err(|_| StoreError::Backend("hub anomaly lock poisoned".to_string()))?;

        let mut by_technique: HashMap<String, Vec<&HubAnomaly>> = HashMap::new();
        for hub_anomaly in guard.iter() {
            if let Some(technique_id) = hub_anomaly.anomaly.technique_id.clone() {
                by_technique.entry(technique_id).or_default().push(hub_anomaly);
            }
        }

        let mut rows = Vec::new();
        for (technique_id, entries) in by_technique {
            let mut affected_nodes: Vec<NodeId> = entries.iter().map(|e| e.source_node).collect();
            affected_nodes.sort();
            affected_nodes.dedup();
            if affected_nodes.len() < 2 {
                continue;
            }

            let total_hits = entries.len() as u64;
            let avg_score = entries.iter().map(|e| e.anomaly.score).sum::<f64>() / entries.len() as f64;
            let first_seen = entries.iter().map(|e| e.imported_at).min().unwrap();
            let last_seen = entries.iter().map(|e| e.imported_at).max().unwrap();
            let tactic = entries.iter().find_map(|e| e.anomaly.tactic.clone());
            let node_count = affected_nodes.len();

            rows.push(TechniqueCorrelation {
                technique_id,
                tactic,
                node_count,
                total_hits,
                affected_nodes,
                avg_score,
                first_seen,
                last_seen,
                threat_level: ThreatLevel::from_node_count(node_count),
            });
        }

        rows.sort_by(|a, b| a.technique_id.cmp(&b.technique_id));
        Ok(rows)
    }
}
