use std::sync::Arc;

use chrono::{Duration, Utc};
use duskwatch_session::{AnalyzeRequest, SessionManager};
use duskwatch_store::memory::InMemoryStore;
use duskwatch_store::{LogStore, ModelStore};
use duskwatch_types::{Config, LogRecord, Severity};

#[tokio::test]
async fn analyze_then_get_session_results_round_trips() {
    let store = Arc::new(InMemoryStore::default());
    let model_dir = tempfile::tempdir().unwrap();
    let model_store = Arc::new(ModelStore::new(model_dir.path()));

    let now = Utc::now();
    for i in 0..30 {
        let record = LogRecord::new(now, "sshd", "Failed password for root from 10.0.0.1 port 22")
            .with_severity(if i == 29 { Severity::Critical } else { Severity::Info });
        store.append(record).await.unwrap();
    }

    let manager = SessionManager::new(store.clone(), model_store, None, Config::default());
    let result = manager
        .analyze(AnalyzeRequest {
            algorithm: None,
            start: now - Duration::hours(1),
            end: now + Duration::hours(1),
            threshold: Some(0.0),
            contamination: 0.1,
            raw_logs_flag: true,
            force_retrain: false,
        })
        .await
        .unwrap();

    assert_eq!(result.logs_analyzed, 30);

    let (session, anomalies) = manager.get_session_results(result.session_id).await.unwrap();
    assert_eq!(session.logs_analyzed, 30);
    assert_eq!(anomalies.len() as u64, session.anomalies_detected);
    assert!(session.logs_analyzed >= session.anomalies_detected);
}

#[tokio::test]
async fn get_session_results_on_unknown_id_is_not_found() {
    let store = Arc::new(InMemoryStore::default());
    let model_dir = tempfile::tempdir().unwrap();
    let model_store = Arc::new(ModelStore::new(model_dir.path()));
    let manager = SessionManager::new(store, model_store, None, Config::default());

    let result = manager.get_session_results(duskwatch_types::SessionId::new()).await;
    assert!(matches!(result, Err(duskwatch_session::SessionError::NotFound)));
}
