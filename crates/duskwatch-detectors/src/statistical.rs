use std::collections::BTreeMap;

use duskwatch_types::{DetectorArtifact, FeatureMatrix};
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, DetectorResult};
use crate::scoring::mean_std;
use crate::trait_def::BaseDetector;

/// Which statistical test drives `Statistical::predict`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatisticalMethod {
    ZScore,
    Iqr,
}

impl Default for StatisticalMethod {
    fn default() -> Self {
        StatisticalMethod::ZScore
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct FittedStats {
    /// Per-column (mean, std) for z-score.
    mean_std: Vec<(f64, f64)>,
    /// Per-column (q1, q3, iqr) for IQR.
    quartiles: Vec<(f64, f64, f64)>,
}

/// Per-column z-score or IQR outlier detector
pub struct Statistical {
    method: StatisticalMethod,
    z_threshold: f64,
    iqr_k: f64,
    fitted: Option<FittedStats>,
}

impl Statistical {
    pub fn new(method: StatisticalMethod) -> Self {
        Self {
            method,
            z_threshold: 3.0,
            iqr_k: 1.5,
            fitted: None,
        }
    }

    pub fn with_z_threshold(mut self, threshold: f64) -> Self {
        self.z_threshold = threshold;
        self
    }

    fn column_count(matrix: &FeatureMatrix) -> usize {
        matrix.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    fn fit_zscore(matrix: &FeatureMatrix) -> Vec<(f64, f64)> {
        let d = Self::column_count(matrix);
        (0..d).map(|j| mean_std(&matrix.column(j))).collect()
    }

    fn fit_iqr(matrix: &FeatureMatrix) -> Vec<(f64, f64, f64)> {
        let d = Self::column_count(matrix);
        (0..d)
            .map(|j| {
                let mut col = matrix.column(j);
                col.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let q1 = percentile(&col, 0.25);
                let q3 = percentile(&col, 0.75);
                let iqr = q3 - q1;
                (q1, q3, if iqr.abs() < 1e-9 { 1e-9 } else { iqr })
            })
            .collect()
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

impl BaseDetector for Statistical {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        let mut hyperparameters = BTreeMap::new();
        hyperparameters.insert("method".to_string(), format!("{:?}", self.method));
        hyperparameters.insert("z_threshold".to_string(), self.z_threshold.to_string());
        hyperparameters
    }

    fn fit(&mut self, matrix: &FeatureMatrix) -> DetectorResult<()> {
        if matrix.is_empty() {
            return Err(DetectorError::EmptyInput);
        }
        self.fitted = Some(FittedStats {
            mean_std: Self::fit_zscore(matrix),
            quartiles: Self::fit_iqr(matrix),
        });
        Ok(())
    }

    fn predict(&self, matrix: &FeatureMatrix) -> DetectorResult<(Vec<i8>, Vec<f64>)> {
        let fitted = self.fitted.as_ref().ok_or(DetectorError::NotFit)?;
        let arity = fitted.mean_std.len();
        if matrix.is_empty() {
            return Err(DetectorError::EmptyInput);
        }
        if Self::column_count(matrix) != arity {
            return Err(DetectorError::ArityMismatch {
                fit: arity,
                got: Self::column_count(matrix),
            });
        }

        let mut labels = Vec::with_capacity(matrix.len());
        let mut raw = Vec::with_capacity(matrix.len());

        for row in &matrix.rows {
            match self.method {
                StatisticalMethod::ZScore => {
                    let max_z = row
                        .iter()
                        .zip(fitted.mean_std.iter())
                        .map(|(x, (mean, std))| (x - mean).abs() / std)
                        .fold(0.0_f64, f64::max);
                    labels.push(if max_z > self.z_threshold { -1 } else { 1 });
                    raw.push(-max_z);
                }
                StatisticalMethod::Iqr => {
                    let outlier_count = row
                        .iter()
                        .zip(fitted.quartiles.iter())
                        .filter(|(x, (q1, q3, iqr))| {
                            **x < q1 - self.iqr_k * iqr || **x > q3 + self.iqr_k * iqr
                        })
                        .count();
                    let score = outlier_count as f64 / row.len() as f64;
                    labels.push(if outlier_count > 0 { -1 } else { 1 });
                    raw.push(-score);
                }
            }
        }

        Ok((labels, raw))
    }

    fn persist(&self) -> DetectorResult<DetectorArtifact> {
        let fitted = self.fitted.as_ref().ok_or(DetectorError::NotFit)?;
        let blob = serde_json::to_vec(fitted)
            .map_err(|e| DetectorError::BadArtifact(e.to_string()))?;
        Ok(DetectorArtifact {
            name: self.name().to_string(),
            feature_arity: fitted.mean_std.len(),
            hyperparameters: self.hyperparameters(),
            integrity_tag: blake3::hash(&blob).to_hex().to_string(),
            trained_state_blob: blob,
        })
    }

    fn restore(&mut self, artifact: &DetectorArtifact) -> DetectorResult<()> {
        let tag = blake3::hash(&artifact.trained_state_blob).to_hex().to_string();
        if tag != artifact.integrity_tag {
            return Err(DetectorError::BadArtifact("integrity tag mismatch".to_string()));
        }
        let fitted: FittedStats = serde_json::from_slice(&artifact.trained_state_blob)
            .map_err(|e| DetectorError::BadArtifact(e.to_string()))?;
        self.fitted = Some(fitted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_with_outlier() -> FeatureMatrix {
        let mut rows = Vec::new();
        for _ in 0..50 {
            let mut row = [0.0; 20];
            row[0] = 10.0;
            rows.push(row);
        }
        let mut outlier = [0.0; 20];
        outlier[0] = 1000.0;
        rows.push(outlier);
        FeatureMatrix::new(rows)
    }

    #[test]
    fn zscore_flags_the_outlier_row() {
        let mut detector = Statistical::new(StatisticalMethod::ZScore);
        let matrix = matrix_with_outlier();
        let (labels, _) = detector.fit_predict(&matrix).unwrap();
        assert_eq!(labels[50], -1);
        assert!(labels[..50].iter().all(|&l| l == 1));
    }

    #[test]
    fn iqr_flags_the_outlier_row() {
        let mut detector = Statistical::new(StatisticalMethod::Iqr);
        let matrix = matrix_with_outlier();
        let (labels, _) = detector.fit_predict(&matrix).unwrap();
        assert_eq!(labels[50], -1);
    }

    #[test]
    fn persist_restore_round_trip() {
        let mut detector = Statistical::new(StatisticalMethod::ZScore);
        let matrix = matrix_with_outlier();
        detector.fit(&matrix).unwrap();
        let artifact = detector.persist().unwrap();

        let mut restored = Statistical::new(StatisticalMethod::ZScore);
        restored.restore(&artifact).unwrap();
        let (labels, _) = restored.predict(&matrix).unwrap();
        assert_eq!(labels[50], -1);
    }

    #[test]
    fn predict_before_fit_errors() {
        let detector = Statistical::new(StatisticalMethod::ZScore);
        let matrix = matrix_with_outlier();
        assert!(matches!(detector.predict(&matrix), Err(DetectorError::NotFit)));
    }
}
