//! Terminal-side export: snapshot the top-K anomalies, join with their
//! source records, wrap in a signed `.qsp` package.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use duskwatch_crypto::canonical_json;
use duskwatch_store::{AnomalyStore, LogStore};
use duskwatch_types::{ExportedAnomaly, LogsSummary, NodeRecord, SyncMethod, SyncPackage, MAX_PACKAGE_ANOMALIES};
use tracing::{info, warn};

use crate::error::{SyncError, SyncResult};

/// Export request parameters.
pub struct ExportRequest<'a> {
    pub node: NodeRecord,
    pub target_node: Option<duskwatch_types::NodeId>,
    /// PEM-encoded private key; `None` produces an unsigned package.
    pub signing_key_pem: Option<&'a str>,
    pub top_k: Option<usize>,
}

/// Build a `SyncPackage` (without writing it to disk) from a store's
/// current top-K anomalies.
pub async fn build_package<S>(store: &S, request: ExportRequest<'_>) -> SyncResult<SyncPackage>
where
    S: AnomalyStore + LogStore,
{
    let top_k = request.top_k.unwrap_or(MAX_PACKAGE_ANOMALIES).min(MAX_PACKAGE_ANOMALIES);
    let anomalies = store.list_top(top_k).await?;

    let mut exported = Vec::with_capacity(anomalies.len());
    for anomaly in anomalies {
        let source_record = store
            .get(anomaly.log_ref)
            .await?
            .ok_or_else(|| SyncError::Malformed(format!("source record {} missing for export", anomaly.log_ref)))?;
        exported.push(ExportedAnomaly { anomaly, source_record });
    }

    let mut package = SyncPackage {
        package_id: duskwatch_types::PackageId::new(),
        source_node: request.node.node_id,
        target_node: request.target_node,
        sync_method: SyncMethod::usb(),
        created_at: chrono::Utc::now(),
        anomalies: exported,
        logs_summary: LogsSummary { node: request.node },
        metadata: serde_json::json!({}),
        signature: None,
    };

    if let Some(private_key_pem) = request.signing_key_pem {
        let canonical = canonical_json(&package)?;
        let signature = duskwatch_crypto::sign(private_key_pem, &canonical)?;
        package.signature = Some(BASE64.encode(signature));
    } else {
        warn!(package_id = %package.package_id.0, "exporting unsigned package");
    }

    info!(package_id = %package.package_id.0, anomalies = package.anomalies.len(), "built sync package");
    Ok(package)
}

/// Write a package to `path` (expected to end in `.qsp`) as UTF-8 JSON.
pub fn write_package(package: &SyncPackage, path: &Path) -> SyncResult<()> {
    let bytes = serde_json::to_vec_pretty(package).map_err(|e| SyncError::Malformed(e.to_string()))?;
    std::fs::write(path, bytes).map_err(|e| SyncError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use duskwatch_store::memory::InMemoryStore;
    use duskwatch_types::{Algorithm, Anomaly, AnomalyId, LogRecord, NodeRole, NodeStatus, NodeTotals, SeverityBand};

    fn sample_node() -> NodeRecord {
        NodeRecord {
            node_id: duskwatch_types::NodeId::new(),
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
        }
    }

    #[tokio::test]
    async fn export_joins_anomalies_with_source_records_and_signs() {
        let store = InMemoryStore::new();
        let record = LogRecord::new(Utc::now(), "sshd", "Failed password for root");
        let record_id = store.append(record).await.unwrap();

        let anomaly = Anomaly {
            id: AnomalyId::new(),
            log_ref: record_id,
            score: 0.95,
            algorithm: Algorithm::Ensemble,
            severity: SeverityBand::Critical,
            feature_snapshot: Default::default(),
            explanation: "test".to_string(),
            technique_id: Some("T1110".to_string()),
            tactic: Some("Credential Access".to_string()),
            detected_at: Utc::now(),
        };
        store
            .save_anomalies(duskwatch_types::SessionId::new(), vec![anomaly])
            .await
            .unwrap();

        let keypair = duskwatch_crypto::generate_keypair().unwrap();
        let package = build_package(
            &store,
            ExportRequest {
                node: sample_node(),
                target_node: None,
                signing_key_pem: Some(&keypair.private_key_pem),
                top_k: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(package.anomalies.len(), 1);
        assert_eq!(package.anomalies[0].source_record.source, "sshd");
        assert!(package.signature.is_some());
    }

    #[tokio::test]
    async fn export_with_no_signing_key_is_unsigned() {
        let store = InMemoryStore::new();
        let package = build_package(
            &store,
            ExportRequest { node: sample_node(), target_node: None, signing_key_pem: None, top_k: None },
        )
        .await
        .unwrap();
        assert!(package.signature.is_none());
    }
}
