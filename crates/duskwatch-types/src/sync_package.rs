use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anomaly::{Anomaly, AnomalyId};
use crate::log_record::LogRecord;
use crate::node::{NodeId, NodeRecord, SyncMethod};

/// Stable identifier for a `SyncPackage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageId(pub Uuid);

impl PackageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PackageId {
    fn default() -> Self {
        Self::new()
    }
}

/// One exported anomaly, joined with its source `LogRecord`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportedAnomaly {
    pub anomaly: Anomaly,
    pub source_record: LogRecord,
}

/// A snapshot of the exporting node's identity, embedded in every package
/// so the hub can upsert `NodeRecord` without a separate handshake.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogsSummary {
    pub node: NodeRecord,
}

/// `{package_id, source_node, target_node, sync_method, created_at,
/// anomalies[], logs_summary, metadata, signature?}`
///
/// Immutable after creation; `signature` covers the canonical serialization
/// of every other field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncPackage {
    pub package_id: PackageId,
    pub source_node: NodeId,
    pub target_node: Option<NodeId>,
    pub sync_method: SyncMethod,
    pub created_at: DateTime<Utc>,
    pub anomalies: Vec<ExportedAnomaly>,
    pub logs_summary: LogsSummary,
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Maximum anomaly count per package
pub const MAX_PACKAGE_ANOMALIES: usize = 500;

/// Imported anomaly plus provenance Unique key
/// `(original_id, source_node)` prevents duplicate imports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HubAnomaly {
    pub original_id: AnomalyId,
    pub source_node: NodeId,
    pub anomaly: Anomaly,
    pub imported_at: DateTime<Utc>,
}

/// A sync-log row recorded on import
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub sync_id: Uuid,
    pub source_node: NodeId,
    pub target_node: NodeId,
    pub sync_method: SyncMethod,
    pub anomalies_synced: u64,
    pub synced_at: DateTime<Utc>,
    pub package_path: String,
}

/// Threat level assigned to a cross-node correlation row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatLevel {
    High,
    Critical,
}

impl ThreatLevel {
    pub fn from_node_count(node_count: usize) -> Self {
        if node_count >= 3 {
            ThreatLevel::Critical
        } else {
            ThreatLevel::High
        }
    }
}

/// One row of the cross-node correlation view
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TechniqueCorrelation {
    pub technique_id: String,
    pub tactic: Option<String>,
    pub node_count: usize,
    pub total_hits: u64,
    pub affected_nodes: Vec<NodeId>,
    pub avg_score: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub threat_level: ThreatLevel,
}
