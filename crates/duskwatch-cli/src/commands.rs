use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use duskwatch_sync::ExportRequest;
use duskwatch_store::memory::{InMemoryHubStore, InMemoryStore};
use duskwatch_tailer::RealtimeMonitor;
use duskwatch_techniques::{StaticTaxonomy, TaxonomyProvider};
use duskwatch_types::{Algorithm, Config, NodeId};

use crate::bootstrap;
use crate::ingest::ingest_file;

fn parse_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    match raw.to_ascii_lowercase().as_str() {
        "isolation_forest" | "isolation-forest" => Ok(Algorithm::IsolationForest),
        "one_class_svm" | "one-class-svm" | "svm" => Ok(Algorithm::OneClassSvm),
        "statistical" => Ok(Algorithm::Statistical),
        "ensemble" => Ok(Algorithm::Ensemble),
        other => anyhow::bail!("unknown algorithm {other:?}"),
    }
}

fn load_taxonomy(path: Option<&Path>) -> anyhow::Result<Option<Arc<dyn TaxonomyProvider>>> {
    match path {
        Some(path) => Ok(Some(Arc::new(StaticTaxonomy::load_from_file(path)?) as Arc<dyn TaxonomyProvider>)),
        None => Ok(None),
    }
}

pub struct AnalyzeArgs {
    pub logs: PathBuf,
    pub data_dir: PathBuf,
    pub algorithm: Option<String>,
    pub threshold: Option<f64>,
    pub contamination: f64,
    pub raw_logs_flag: bool,
    pub force_retrain: bool,
    pub taxonomy: Option<PathBuf>,
}

pub async fn handle_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::default());
    let ingested = ingest_file(store.as_ref(), &args.logs).await?;
    tracing::info!(ingested, path = %args.logs.display(), "ingested log lines");

    let algorithm = args.algorithm.as_deref().map(parse_algorithm).transpose()?;
    let taxonomy = load_taxonomy(args.taxonomy.as_deref())?;
    let model_store = Arc::new(bootstrap::model_store(&args.data_dir));
    let config = Config::from_env();
    let manager = duskwatch_session::SessionManager::new(store, model_store, taxonomy, config);

    let request = duskwatch_session::AnalyzeRequest {
        algorithm,
        start: Utc::now() - Duration::days(365),
        end: Utc::now() + Duration::minutes(1),
        threshold: args.threshold,
        contamination: args.contamination,
        raw_logs_flag: args.raw_logs_flag,
        force_retrain: args.force_retrain,
    };

    let result = manager.analyze(request).await?;
    let (session, anomalies) = manager.get_session_results(result.session_id).await?;

    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "session_id": session.session_id.0,
        "logs_analyzed": result.logs_analyzed,
        "anomalies_detected": result.anomalies_detected,
        "duration_ms": result.duration_ms,
        "anomalies": anomalies,
    }))?);

    Ok(())
}

pub async fn handle_tail(files: Vec<PathBuf>) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::default());
    let monitor = Arc::new(RealtimeMonitor::new(store));
    for file in &files {
        monitor.add_file(file).await?;
    }

    let mut receiver = monitor.take_receiver().await.expect("receiver not yet taken");
    monitor.start().await;
    tracing::info!(files = ?files, "tailing; press Ctrl+C to stop");

    loop {
        tokio::select! {
            event = receiver.recv() => {
                match event {
                    Some(event) => println!("{}", serde_json::to_string(&event)?),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.stop().await;
    Ok(())
}

pub struct ExportArgs {
    pub logs: PathBuf,
    pub out: PathBuf,
    pub data_dir: PathBuf,
    pub hostname: String,
    pub sign_key: Option<PathBuf>,
    pub top_k: Option<usize>,
    pub algorithm: Option<String>,
    pub threshold: Option<f64>,
    pub contamination: f64,
}

pub async fn handle_export(args: ExportArgs) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::default());
    ingest_file(store.as_ref(), &args.logs).await?;

    let algorithm = args.algorithm.as_deref().map(parse_algorithm).transpose()?;
    let model_store = Arc::new(bootstrap::model_store(&args.data_dir));
    let config = Config::from_env();
    let manager = duskwatch_session::SessionManager::new(store.clone(), model_store, None, config);

    manager
        .analyze(duskwatch_session::AnalyzeRequest {
            algorithm,
            start: Utc::now() - Duration::days(365),
            end: Utc::now() + Duration::minutes(1),
            threshold: args.threshold,
            contamination: args.contamination,
            raw_logs_flag: true,
            force_retrain: false,
        })
        .await?;

    let node_id = bootstrap::load_node_id(&args.data_dir)?;
    let node = bootstrap::local_node_record(node_id, &args.hostname);
    let signing_key_pem = match &args.sign_key {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };

    let package = duskwatch_sync::build_package(
        store.as_ref(),
        ExportRequest {
            node,
            target_node: None,
            signing_key_pem: signing_key_pem.as_deref(),
            top_k: args.top_k,
        },
    )
    .await?;

    duskwatch_sync::write_package(&package, &args.out)?;
    println!("wrote {} anomalies to {}", package.anomalies.len(), args.out.display());
    Ok(())
}

pub struct ImportArgs {
    pub packages: Vec<PathBuf>,
    pub verify_key: Option<PathBuf>,
    pub target_node: Option<String>,
}

pub async fn handle_import(args: ImportArgs) -> anyhow::Result<()> {
    let hub_store = InMemoryHubStore::new();
    let verify_key_pem = match &args.verify_key {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };
    let target_node = match &args.target_node {
        Some(raw) => NodeId(uuid::Uuid::parse_str(raw)?),
        None => NodeId::new(),
    };

    for path in &args.packages {
        let package = duskwatch_sync::read_package(path)?;
        let outcome = duskwatch_sync::import_package(
            &hub_store,
            package,
            verify_key_pem.as_deref(),
            target_node,
            path.to_string_lossy().as_ref(),
        )
        .await?;
        println!(
            "{}: {} synced, {} duplicates skipped",
            path.display(),
            outcome.anomalies_synced,
            outcome.duplicates_skipped
        );
    }

    let correlations = duskwatch_sync::correlate_techniques(&hub_store).await?;
    if correlations.is_empty() {
        println!("no cross-node technique correlations yet");
    } else {
        println!("{}", serde_json::to_string_pretty(&correlations)?);
    }

    Ok(())
}

