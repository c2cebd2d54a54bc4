//! Data-directory conventions shared by every subcommand: node identity
//! file and Model Store root, both rooted under `--data-dir`.

use std::path::{Path, PathBuf};

use duskwatch_store::ModelStore;
use duskwatch_types::{NodeId, NodeRecord, NodeRole, NodeStatus, NodeTotals, SyncMethod};

pub fn node_identity_path(data_dir: &Path) -> PathBuf {
    data_dir.join("node_id")
}

pub fn load_node_id(data_dir: &Path) -> anyhow::Result<NodeId> {
    Ok(duskwatch_crypto::load_or_create_node_identity(&node_identity_path(data_dir))?)
}

pub fn model_store(data_dir: &Path) -> ModelStore {
    ModelStore::new(duskwatch_store::default_root(data_dir))
}

/// A snapshot of the running host, used as the `logs_summary.node` field
/// of an exported package.
pub fn local_node_record(node_id: NodeId, hostname: &str) -> NodeRecord {
    NodeRecord {
        node_id,
        hostname: hostname.to_string(),
        role: NodeRole::Terminal,
        status: NodeStatus::Online,
        ip: None,
        os: std::env::consts::OS.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        last_seen: chrono::Utc::now(),
        last_sync: None,
        totals: NodeTotals::default(),
        sync_method: SyncMethod::usb(),
        metadata: serde_json::json!({}),
    }
}
