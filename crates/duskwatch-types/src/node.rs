use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, once-generated identifier for a host: exactly one `node_id` per
/// host, generated on first run and preserved thereafter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a node plays in the multi-node aggregation substate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Terminal,
    Hub,
}

/// Liveness/health status of a node as last observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Offline,
    Unknown,
}

/// The only sync transport in scope; networked (non-USB) sync is out of
/// scope. Kept as a string newtype rather than a single-variant enum so a
/// future transport can be added without an enum-exhaustiveness break at
/// every call site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMethod(pub String);

impl SyncMethod {
    pub fn usb() -> Self {
        Self("usb".to_string())
    }

    pub fn is_usb(&self) -> bool {
        self.0 == "usb"
    }
}

/// Running totals tracked per node for dashboard/ops purposes.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct NodeTotals {
    pub logs_ingested: u64,
    pub anomalies_detected: u64,
    pub sync_packages_sent: u64,
    pub sync_packages_received: u64,
}

/// `{node_id, hostname, role, status, ip?, os, version, last_seen,
/// last_sync, totals, sync_method, metadata}`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub hostname: String,
    pub role: NodeRole,
    pub status: NodeStatus,
    pub ip: Option<String>,
    pub os: String,
    pub version: String,
    pub last_seen: DateTime<Utc>,
    pub last_sync: Option<DateTime<Utc>>,
    pub totals: NodeTotals,
    pub sync_method: SyncMethod,
    pub metadata: serde_json::Value,
}
