//! Analysis Session Manager (C7): owns the `running -> completed|failed`
//! lifecycle and drives feature extraction, the ensemble, and the
//! technique mapper over chunked windows of the persistent log store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use duskwatch_ensemble::EnsembleConfig;
use duskwatch_store::{AnalysisStore, AnomalyStore, LogStore, ModelStore, QueryWindow, SessionStore};
use duskwatch_techniques::TaxonomyProvider;
use duskwatch_types::{
    Algorithm, Anomaly, AnomalyId, AnalysisSession, Config, SessionId, SessionStatus, SeverityBand,
};

use crate::error::{SessionError, SessionResult};
use crate::explanation::explain;

/// Parameters for one `analyze()` invocation.
pub struct AnalyzeRequest {
    /// `None` selects ensemble mode; `Some` runs exactly that detector.
    pub algorithm: Option<Algorithm>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Caller override for the anomaly threshold; falls back to
    /// `Config::anomaly_threshold` when unset.
    pub threshold: Option<f64>,
    pub contamination: f64,
    /// In single-algorithm mode, whether to blend in keyword scores.
    /// Ensemble mode always runs the keyword scorer as a fixed-weight peer
    /// regardless of this flag.
    pub raw_logs_flag: bool,
    pub force_retrain: bool,
}

pub struct AnalysisResult {
    pub session_id: SessionId,
    pub logs_analyzed: u64,
    pub anomalies_detected: u64,
    pub duration_ms: i64,
}

pub struct SessionManager<S: AnalysisStore> {
    store: Arc<S>,
    model_store: Arc<ModelStore>,
    taxonomy: Option<Arc<dyn TaxonomyProvider>>,
    config: Config,
}

impl<S: AnalysisStore> SessionManager<S> {
    pub fn new(
        store: Arc<S>,
        model_store: Arc<ModelStore>,
        taxonomy: Option<Arc<dyn TaxonomyProvider>>,
        config: Config,
    ) -> Self {
        Self { store, model_store, taxonomy, config }
    }

    pub async fn analyze(&self, request: AnalyzeRequest) -> SessionResult<AnalysisResult> {
        let threshold = request.threshold.unwrap_or(self.config.anomaly_threshold);
        let parameters = serde_json::json!({
            "algorithm": request.algorithm.map(|a| a.to_string()),
            "threshold": threshold,
            "contamination": request.contamination,
            "raw_logs_flag": request.raw_logs_flag,
            "force_retrain": request.force_retrain,
            "start": request.start,
            "end": request.end,
        });

        let mut session = AnalysisSession::open(parameters);
        let session_id = session.session_id;
        self.store.create(session.clone()).await?;

        match self.run(&request, threshold, session_id).await {
            Ok((logs_analyzed, anomalies_detected)) => {
                session.status = SessionStatus::Completed;
                session.end_time = Some(Utc::now());
                session.logs_analyzed = logs_analyzed;
                session.anomalies_detected = anomalies_detected;
                let duration_ms = (session.end_time.unwrap() - session.start_time).num_milliseconds();
                self.store.update(session).await?;
                Ok(AnalysisResult { session_id, logs_analyzed, anomalies_detected, duration_ms })
            }
            Err(err) => {
                session.status = SessionStatus::Failed;
                session.end_time = Some(Utc::now());
                session.metadata_json = serde_json::json!({ "error": err.to_string() });
                if let Err(update_err) = self.store.update(session).await {
                    tracing::error!(error = %update_err, "failed to persist failed session status");
                }
                Err(err)
            }
        }
    }

    pub async fn get_session_results(&self, session_id: SessionId) -> SessionResult<(AnalysisSession, Vec<Anomaly>)> {
        let session = SessionStore::get(self.store.as_ref(), session_id).await?.ok_or(SessionError::NotFound)?;
        let anomalies = self.store.list_for_session(session_id).await?;
        Ok((session, anomalies))
    }

    async fn run(&self, request: &AnalyzeRequest, threshold: f64, session_id: SessionId) -> SessionResult<(u64, u64)> {
        let total = self.store.count_between(request.start, request.end).await?;
        if total == 0 {
            return Ok((0, 0));
        }

        let chunk_size = if total > self.config.large_dataset_threshold {
            self.config.batch_size
        } else {
            total
        };

        let mut offset = 0usize;
        let mut logs_analyzed = 0u64;
        let mut anomalies = Vec::new();

        while offset < total {
            let window = QueryWindow { limit: chunk_size, offset };
            let records = self.store.list_between(request.start, request.end, window).await?;
            if records.is_empty() {
                break;
            }
            logs_analyzed += records.len() as u64;

            let (matrix, _tables) = duskwatch_features::extract_features(&records)?;
            let ensemble_config = EnsembleConfig {
                contamination: request.contamination,
                seed: self.config.random_seed,
                svm_max_samples: self.config.svm_max_samples,
                force_retrain: request.force_retrain,
            };

            let output = match request.algorithm {
                Some(algorithm) => {
                    let raw = if request.raw_logs_flag { Some(records.as_slice()) } else { None };
                    duskwatch_ensemble::run_single(algorithm, &matrix, raw, &self.model_store, &ensemble_config)?
                }
                None => {
                    duskwatch_ensemble::run_ensemble(
                        matrix.clone(),
                        records.clone(),
                        self.model_store.clone(),
                        ensemble_config,
                    )
                    .await?
                }
            };

            for (idx, record) in records.iter().enumerate() {
                let score = output.calibrated_scores[idx];
                let label = output.labels[idx];
                if score < threshold || label != -1 {
                    continue;
                }

                let feature_snapshot = matrix.row_as_map(idx);
                let explanation = explain(score, &feature_snapshot);
                let mut anomaly = Anomaly {
                    id: AnomalyId::new(),
                    log_ref: record.id,
                    score,
                    algorithm: request.algorithm.unwrap_or(Algorithm::Ensemble),
                    severity: SeverityBand::from_score(score),
                    feature_snapshot,
                    explanation,
                    technique_id: None,
                    tactic: None,
                    detected_at: Utc::now(),
                };
                duskwatch_techniques::apply(&mut anomaly, record, self.taxonomy.as_deref());
                anomalies.push(anomaly);
            }

            offset += records.len();
        }

        let anomalies_detected = anomalies.len() as u64;
        if !anomalies.is_empty() {
            self.store.save_anomalies(session_id, anomalies).await?;
        }

        Ok((logs_analyzed, anomalies_detected))
    }
}
