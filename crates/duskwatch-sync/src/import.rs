//! Hub-side import: parse a `.qsp` file, verify its signature if present,
//! upsert the source node, and insert each anomaly with duplicate skip.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use duskwatch_crypto::canonical_json;
use duskwatch_store::HubStore;
use duskwatch_types::{HubAnomaly, NodeId, SyncLogEntry, SyncMethod, SyncPackage};
use tracing::{info, warn};

use crate::error::{SyncError, SyncResult};

pub struct ImportOutcome {
    pub sync_id: uuid::Uuid,
    pub anomalies_synced: u64,
    pub duplicates_skipped: u64,
}

/// Read and parse a package file without verifying or persisting it.
pub fn read_package(path: &Path) -> SyncResult<SyncPackage> {
    let bytes = std::fs::read(path).map_err(|e| SyncError::Io(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| SyncError::Malformed(e.to_string()))
}

/// Verify `package`'s signature against `public_key_pem` when present.
/// A package with no signature is accepted unverified (the core only
/// rejects a signature that is present and invalid).
fn verify_signature(package: &SyncPackage, public_key_pem: Option<&str>) -> SyncResult<()> {
    let Some(signature_b64) = &package.signature else {
        return Ok(());
    };
    let Some(public_key_pem) = public_key_pem else {
        warn!(package_id = %package.package_id.0, "signed package received with no verification key configured");
        return Err(SyncError::SignatureInvalid);
    };

    let mut unsigned = package.clone();
    unsigned.signature = None;
    let canonical = canonical_json(&unsigned)?;

    let signature_bytes = BASE64
        .decode(signature_b64)
        .map_err(|e| SyncError::Malformed(format!("signature is not valid base64: {e}")))?;

    if duskwatch_crypto::verify(public_key_pem, &canonical, &signature_bytes)? {
        Ok(())
    } else {
        Err(SyncError::SignatureInvalid)
    }
}

/// Import `package` into the hub store, recording a sync-log row. The
/// package's filesystem path is recorded verbatim for audit purposes.
pub async fn import_package<H: HubStore>(
    store: &H,
    package: SyncPackage,
    public_key_pem: Option<&str>,
    target_node: NodeId,
    package_path: &str,
) -> SyncResult<ImportOutcome> {
    verify_signature(&package, public_key_pem)?;

    store.upsert_node(package.logs_summary.node.clone()).await?;

    let mut anomalies_synced = 0u64;
    let mut duplicates_skipped = 0u64;
    for exported in package.anomalies {
        let hub_anomaly = HubAnomaly {
            original_id: exported.anomaly.id,
            source_node: package.source_node,
            anomaly: exported.anomaly,
            imported_at: chrono::Utc::now(),
        };
        if store.insert_hub_anomaly(hub_anomaly).await? {
            anomalies_synced += 1;
        } else {
            duplicates_skipped += 1;
        }
    }

    let sync_id = uuid::Uuid::new_v4();
    store
        .record_sync_log(SyncLogEntry {
            sync_id,
            source_node: package.source_node,
            target_node,
            sync_method: SyncMethod::usb(),
            anomalies_synced,
            synced_at: chrono::Utc::now(),
            package_path: package_path.to_string(),
        })
        .await?;

    info!(sync_id = %sync_id, anomalies_synced, duplicates_skipped, "imported sync package");
    Ok(ImportOutcome { sync_id, anomalies_synced, duplicates_skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use duskwatch_store::memory::InMemoryHubStore;
    use duskwatch_types::{
        Algorithm, Anomaly, AnomalyId, ExportedAnomaly, LogRecord, LogsSummary, NodeRecord, NodeRole,
        NodeStatus, NodeTotals, PackageId, SeverityBand,
    };

    fn sample_package(signature: Option<String>) -> SyncPackage {
        let anomaly = Anomaly {
            id: AnomalyId::new(),
            log_ref: duskwatch_types::LogRecordId::new(),
            score: 0.9,
            algorithm: Algorithm::Ensemble,
            severity: SeverityBand::Critical,
            feature_snapshot: Default::default(),
            explanation: "test".to_string(),
            technique_id: Some("T1110".to_string()),
            tactic: Some("Credential Access".to_string()),
            detected_at: Utc::now(),
        };
        let source_record = LogRecord::new(Utc::now(), "sshd", "Failed password for root");
        let node = NodeRecord {
            node_id: NodeId::new(),
            hostname: "terminal-1".to_string(),
            role: NodeRole::Terminal,
            status: NodeStatus::Online,
            ip: None,
            os: "linux".to_string(),
            version: "0.1.0".to_string(),
            last_seen: Utc::now(),
            last_sync: None,
            totals: NodeTotals::default(),
            sync_method: SyncMethod::usb(),
            metadata: serde_json::json!({}),
        };
        SyncPackage {
            package_id: PackageId::new(),
            source_node: node.node_id,
            target_node: None,
            sync_method: SyncMethod::usb(),
            created_at: Utc::now(),
            anomalies: vec![ExportedAnomaly { anomaly, source_record }],
            logs_summary: LogsSummary { node },
            metadata: serde_json::json!({}),
            signature,
        }
    }

    #[tokio::test]
    async fn import_persists_node_and_anomaly_and_sync_log() {
        let store = InMemoryHubStore::new();
        let package = sample_package(None);
        let outcome = import_package(&store, package, None, NodeId::new(), "/tmp/a.qsp").await.unwrap();
        assert_eq!(outcome.anomalies_synced, 1);
        assert_eq!(outcome.duplicates_skipped, 0);
    }

    #[tokio::test]
    async fn reimporting_the_same_package_skips_duplicates() {
        let store = InMemoryHubStore::new();
        let package = sample_package(None);
        import_package(&store, package.clone(), None, NodeId::new(), "/tmp/a.qsp").await.unwrap();
        let second = import_package(&store, package, None, NodeId::new(), "/tmp/a.qsp").await.unwrap();
        assert_eq!(second.anomalies_synced, 0);
        assert_eq!(second.duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let keypair = duskwatch_crypto::generate_keypair().unwrap();
        let mut unsigned = sample_package(None);
        unsigned.signature = None;
        let canonical = canonical_json(&unsigned).unwrap();
        let signature = duskwatch_crypto::sign(&keypair.private_key_pem, &canonical).unwrap();
        let mut signed = unsigned.clone();
        signed.signature = Some(BASE64.encode(signature));

        // Mutate a field after signing so the canonical bytes no longer match.
        signed.anomalies[0].anomaly.score = 0.01;

        let store = InMemoryHubStore::new();
        let result = import_package(&store, signed, Some(&keypair.public_key_pem), NodeId::new(), "/tmp/a.qsp").await;
        assert!(matches!(result, Err(SyncError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn present_signature_with_no_key_available_is_rejected() {
        let package = sample_package(Some("not-checkable".to_string()));
        let store = InMemoryHubStore::new();
        let result = import_package(&store, package, None, NodeId::new(), "/tmp/a.qsp").await;
        assert!(matches!(result, Err(SyncError::SignatureInvalid)));
    }
}
