use chrono::Utc;
use duskwatch_store::memory::{InMemoryHubStore, InMemoryStore};
use duskwatch_store::{AnomalyStore, LogStore};
use duskwatch_sync::{build_package, correlate_techniques, import_package, write_package, ExportRequest};
use duskwatch_types::{
    Algorithm, Anomaly, AnomalyId, LogRecord, NodeId, NodeRecord, NodeRole, NodeStatus, NodeTotals,
    SessionId, SeverityBand, SyncMethod,
};

fn node(hostname: &str) -> NodeRecord {
    NodeRecord {
        node_id: NodeId::new(),
        hostname: hostname.to_string(),
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

async fn seed_anomaly(store: &InMemoryStore, technique_id: &str) {
    let record = LogRecord::new(Utc::now(), "sshd", "Failed password for root");
    let record_id = store.append(record).await.unwrap();
    let anomaly = Anomaly {
        id: AnomalyId::new(),
        log_ref: record_id,
        score: 0.92,
        algorithm: Algorithm::Ensemble,
        severity: SeverityBand::Critical,
        feature_snapshot: Default::default(),
        explanation: "credential access pattern".to_string(),
        technique_id: Some(technique_id.to_string()),
        tactic: Some("Credential Access".to_string()),
        detected_at: Utc::now(),
    };
    store.save_anomalies(SessionId::new(), vec![anomaly]).await.unwrap();
}

#[tokio::test]
async fn exported_package_round_trips_through_import() {
    let terminal_store = InMemoryStore::new();
    seed_anomaly(&terminal_store, "T1110").await;

    let keypair = duskwatch_crypto::generate_keypair().unwrap();
    let package = build_package(
        &terminal_store,
        ExportRequest {
            node: node("terminal-1"),
            target_node: None,
            signing_key_pem: Some(&keypair.private_key_pem),
            top_k: None,
        },
    )
    .await
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.qsp");
    write_package(&package, &path).unwrap();

    let parsed = duskwatch_sync::read_package(&path).unwrap();
    let hub_store = InMemoryHubStore::new();
    let outcome = import_package(
        &hub_store,
        parsed,
        Some(&keypair.public_key_pem),
        NodeId::new(),
        path.to_str().unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.anomalies_synced, 1);
    assert_eq!(outcome.duplicates_skipped, 0);
}

#[tokio::test]
async fn technique_hit_on_three_nodes_is_critical() {
    let hub_store = InMemoryHubStore::new();

    for hostname in ["terminal-1", "terminal-2", "terminal-3"] {
        let terminal_store = InMemoryStore::new();
        seed_anomaly(&terminal_store, "T1110").await;
        let package = build_package(
            &terminal_store,
            ExportRequest { node: node(hostname), target_node: None, signing_key_pem: None, top_k: None },
        )
        .await
        .unwrap();
        import_package(&hub_store, package, None, NodeId::new(), "/tmp/x.qsp").await.unwrap();
    }

    let rows = correlate_techniques(&hub_store).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].technique_id, "T1110");
    assert_eq!(rows[0].node_count, 3);
    assert_eq!(rows[0].threat_level, duskwatch_types::ThreatLevel::Critical);
}

#[tokio::test]
async fn technique_hit_on_a_single_node_is_not_correlated() {
    let hub_store = InMemoryHubStore::new();
    let terminal_store = InMemoryStore::new();
    seed_anomaly(&terminal_store, "T1003").await;
    let package = build_package(
        &terminal_store,
        ExportRequest { node: node("terminal-1"), target_node: None, signing_key_pem: None, top_k: None },
    )
    .await
    .unwrap();
    import_package(&hub_store, package, None, NodeId::new(), "/tmp/x.qsp").await.unwrap();

    let rows = correlate_techniques(&hub_store).await.unwrap();
    assert!(rows.is_empty());
}
