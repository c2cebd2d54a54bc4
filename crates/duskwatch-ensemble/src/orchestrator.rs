//! Ensemble Orchestrator (C5): single-algorithm restore/fit/persist, and
//! concurrent multi-detector fan-out with fixed-weight fusion.

use std::sync::Arc;

use duskwatch_detectors::{BaseDetector, IsolationForest, OneClassSvm, Statistical};
use duskwatch_store::ModelStore;
use duskwatch_types::{Algorithm, FeatureMatrix, LogRecord};
use tokio::sync::Semaphore;

use crate::calibration::calibrate;
use crate::error::{EnsembleError, EnsembleResult};

/// Percentile used to derive the `-1`/`+1` label from calibrated scores,
/// independent of any caller-supplied anomaly threshold.
pub const LABEL_PERCENTILE: f64 = 0.85;

/// Fixed ensemble-mode fusion weights.
const WEIGHT_ISOLATION_FOREST: f64 = 0.35;
const WEIGHT_ONE_CLASS_SVM: f64 = 0.25;
const WEIGHT_STATISTICAL: f64 = 0.20;
const WEIGHT_KEYWORD: f64 = 0.20;

/// Upper bound on concurrently running detector workers.
const MAX_CONCURRENT_WORKERS: usize = 4;

/// Result of one ensemble invocation over a chunk's feature matrix.
pub struct EnsembleOutput {
    pub calibrated_scores: Vec<f64>,
    pub labels: Vec<i8>,
}

/// Tunables the orchestrator needs that are independent of which detector
/// or mode is selected.
#[derive(Clone, Copy, Debug)]
pub struct EnsembleConfig {
    pub contamination: f64,
    pub seed: u64,
    pub svm_max_samples: usize,
    pub force_retrain: bool,
}

fn build_detector(algorithm: Algorithm, config: &EnsembleConfig) -> Option<Box<dyn BaseDetector>> {
    match algorithm {
        Algorithm::IsolationForest => Some(Box::new(IsolationForest::new(config.contamination, config.seed))),
        Algorithm::OneClassSvm => {
            Some(Box::new(OneClassSvm::new(config.contamination, config.svm_max_samples, config.seed)))
        }
        Algorithm::Statistical => Some(Box::new(Statistical::new(Default::default()))),
        Algorithm::Keyword | Algorithm::Ensemble => None,
    }
}

/// Restore `detector` from `model_store` if a matching artifact exists and
/// `force_retrain` was not requested; otherwise fit it fresh and persist
/// the result.
fn restore_or_fit(
    detector: &mut dyn BaseDetector,
    matrix: &FeatureMatrix,
    model_store: &ModelStore,
    force_retrain: bool,
) -> EnsembleResult<()> {
    let key = detector.name();
    let arity = matrix.rows.first().map(|r| r.len()).unwrap_or(0);

    if !force_retrain {
        let (artifact, ok) = model_store.load(key, key, arity, &detector.hyperparameters());
        if ok {
            if let Some(artifact) = artifact {
                if detector.restore(&artifact).is_ok() {
                    return Ok(());
                }
                tracing::warn!(detector = key, "model store artifact failed to restore, retraining");
            }
        }
    }

    detector
        .fit(matrix)
        .map_err(|e| EnsembleError::Detector(format!("{key} fit failed: {e}")))?;
    let artifact = detector
        .persist()
        .map_err(|e| EnsembleError::Detector(format!("{key} persist failed: {e}")))?;
    model_store.save(key, &artifact)?;
    Ok(())
}

/// Runs exactly one base detector.
pub fn run_single(
    algorithm: Algorithm,
    matrix: &FeatureMatrix,
    raw_records: Option<&[LogRecord]>,
    model_store: &ModelStore,
    config: &EnsembleConfig,
) -> EnsembleResult<EnsembleOutput> {
    if matrix.is_empty() {
        return Err(EnsembleError::EmptyInput);
    }

    let mut detector = build_detector(algorithm, config)
        .ok_or_else(|| EnsembleError::Detector(format!("{algorithm} is not a single-algorithm selection")))?;

    restore_or_fit(detector.as_mut(), matrix, model_store, config.force_retrain)?;
    let (_, detector_raw) = detector
        .predict(matrix)
        .map_err(|e| EnsembleError::Detector(format!("{} predict failed: {e}", detector.name())))?;
    let detector_scores = duskwatch_detectors::normalize(&detector_raw);

    let blended = match raw_records {
        Some(records) => {
            let keyword_scores = duskwatch_keywords::score_batch(records);
            blend(&detector_scores, &keyword_scores, 0.75, 0.25)
        }
        None => detector_scores,
    };

    Ok(finish(blended))
}

/// Runs every base detector plus the keyword scorer concurrently and fuses
/// them with fixed weights.
pub async fn run_ensemble(
    matrix: FeatureMatrix,
    raw_records: Vec<LogRecord>,
    model_store: Arc<ModelStore>,
    config: EnsembleConfig,
) -> EnsembleResult<EnsembleOutput> {
    if matrix.is_empty() {
        return Err(EnsembleError::EmptyInput);
    }

    let algorithms = [Algorithm::IsolationForest, Algorithm::OneClassSvm, Algorithm::Statistical];
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_WORKERS.min(algorithms.len())));

    let mut tasks = Vec::with_capacity(algorithms.len());
    for algorithm in algorithms {
        let semaphore = semaphore.clone();
        let matrix = matrix.clone();
        let model_store = model_store.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("ensemble semaphore closed");
            tokio::task::spawn_blocking(move || {
                let mut detector = build_detector(algorithm, &config)
                    .expect("base-detector algorithms always build");
                restore_or_fit(detector.as_mut(), &matrix, &model_store, config.force_retrain)?;
                let (_, raw) = detector
                    .predict(&matrix)
                    .map_err(|e| EnsembleError::Detector(format!("{} predict failed: {e}", detector.name())))?;
                Ok::<(Algorithm, Vec<f64>), EnsembleError>((algorithm, duskwatch_detectors::normalize(&raw)))
            })
            .await
            .map_err(|e| EnsembleError::Join(e.to_string()))?
        }));
    }

    let n = matrix.len();
    let keyword_scores = duskwatch_keywords::score_batch(&raw_records);

    let mut weighted = vec![0.0_f64; n];
    for task in tasks {
        match task.await {
            Ok(Ok((algorithm, scores))) => {
                let weight = match algorithm {
                    Algorithm::IsolationForest => WEIGHT_ISOLATION_FOREST,
                    Algorithm::OneClassSvm => WEIGHT_ONE_CLASS_SVM,
                    Algorithm::Statistical => WEIGHT_STATISTICAL,
                    Algorithm::Keyword | Algorithm::Ensemble => 0.0,
                };
                for (w, s) in weighted.iter_mut().zip(&scores) {
                    *w += weight * s;
                }
            }
            Ok(Err(err)) => {
                // A failed detector contributes zero, per the orchestrator contract: isolation
                // failure does not fail the batch.
                tracing::warn!(error = %err, "base detector failed, treating as zero vector");
            }
            Err(err) => {
                tracing::warn!(error = %err, "detector worker task panicked, treating as zero vector");
            }
        }
    }

    for (w, s) in weighted.iter_mut().zip(&keyword_scores) {
        *w += WEIGHT_KEYWORD * s;
    }

    Ok(finish(weighted))
}

fn blend(a: &[f64], b: &[f64], weight_a: f64, weight_b: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| weight_a * x + weight_b * y).collect()
}

fn finish(blended: Vec<f64>) -> EnsembleOutput {
    let calibrated_scores = calibrate(&blended);
    let threshold = percentile(&calibrated_scores, LABEL_PERCENTILE);
    let labels = calibrated_scores.iter().map(|&s| if s >= threshold { -1 } else { 1 }).collect();
    EnsembleOutput { calibrated_scores, labels }
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((p * (sorted.len() - 1) as f64).round() as usize).min(sorted.len() - 1);
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use duskwatch_types::FeatureRow;

    fn outlier_matrix() -> FeatureMatrix {
        let mut rows = Vec::new();
        for _ in 0..40 {
            rows.push([0.0; 20]);
        }
        let mut outlier: FeatureRow = [0.0; 20];
        outlier[0] = 500.0;
        rows.push(outlier);
        FeatureMatrix::new(rows)
    }

    fn default_config() -> EnsembleConfig {
        EnsembleConfig { contamination: 0.05, seed: 7, svm_max_samples: 1000, force_retrain: false }
    }

    #[test]
    fn single_algorithm_mode_flags_the_outlier() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let matrix = outlier_matrix();
        let output = run_single(Algorithm::IsolationForest, &matrix, None, &store, &default_config()).unwrap();
        assert_eq!(output.labels[matrix.len() - 1], -1);
    }

    #[test]
    fn single_algorithm_mode_restores_from_store_on_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let matrix = outlier_matrix();
        run_single(Algorithm::Statistical, &matrix, None, &store, &default_config()).unwrap();
        let second = run_single(Algorithm::Statistical, &matrix, None, &store, &default_config()).unwrap();
        assert_eq!(second.labels[matrix.len() - 1], -1);
    }

    #[test]
    fn single_algorithm_mode_blends_keyword_scores_when_raw_records_supplied() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let matrix = outlier_matrix();
        let records: Vec<LogRecord> = (0..matrix.len())
            .map(|_| LogRecord::new(Utc::now(), "sshd", "Failed password for root"))
            .collect();
        let output = run_single(Algorithm::IsolationForest, &matrix, Some(&records), &store, &default_config()).unwrap();
        assert_eq!(output.calibrated_scores.len(), matrix.len());
    }

    #[tokio::test]
    async fn ensemble_mode_flags_the_outlier() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ModelStore::new(dir.path()));
        let matrix = outlier_matrix();
        let records: Vec<LogRecord> =
            (0..matrix.len()).map(|_| LogRecord::new(Utc::now(), "systemd", "Started session")).collect();
        let output = run_ensemble(matrix.clone(), records, store, default_config()).await.unwrap();
        assert_eq!(output.labels[matrix.len() - 1], -1);
    }

    #[test]
    fn empty_matrix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let matrix = FeatureMatrix::new(Vec::new());
        assert!(matches!(
            run_single(Algorithm::Statistical, &matrix, None, &store, &default_config()),
            Err(EnsembleError::EmptyInput)
        ));
    }
}
