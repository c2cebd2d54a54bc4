use std::collections::BTreeMap;

use duskwatch_types::{DetectorArtifact, FeatureMatrix};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, DetectorResult};
use crate::scoring::mean_std;
use crate::trait_def::BaseDetector;

const SOLVER_ITERATIONS: usize = 200;
const SOLVER_STEP: f64 = 0.05;

fn rbf_kernel(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let sq_dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    (-gamma * sq_dist).exp()
}

/// Projects `v` onto `{x : 0 <= x_i <= cap, sum(x) = target}` by bisecting
/// on the shift applied before clamping (the standard capped-simplex
/// projection used by box-constrained quadratic solvers).
fn project_capped_simplex(v: &[f64], cap: f64, target: f64) -> Vec<f64> {
    let mut lo = v.iter().cloned().fold(f64::INFINITY, f64::min) - cap - 1.0;
    let mut hi = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max) + 1.0;
    for _ in 0..100 {
        let mid = (lo + hi) / 2.0;
        let sum: f64 = v.iter().map(|x| (x - mid).clamp(0.0, cap)).sum();
        if sum > target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let tau = (lo + hi) / 2.0;
    v.iter().map(|x| (x - tau).clamp(0.0, cap)).collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FittedSvm {
    support_vectors: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    rho: f64,
    gamma: f64,
    feature_mean: Vec<f64>,
    feature_std: Vec<f64>,
}

/// RBF-kernel one-class SVM approximated by projected-gradient descent on
/// the nu-SVM dual `nu` is `max(contamination, 0.001)`.
pub struct OneClassSvm {
    contamination: f64,
    max_samples: usize,
    seed: u64,
    fitted: Option<FittedSvm>,
}

impl OneClassSvm {
    pub fn new(contamination: f64, max_samples: usize, seed: u64) -> Self {
        Self { contamination, max_samples, seed, fitted: None }
    }

    fn nu(&self) -> f64 {
        self.contamination.max(0.001)
    }

    fn standardize(mean: &[f64], std: &[f64], row: &[f64]) -> Vec<f64> {
        row.iter().zip(mean).zip(std).map(|((x, m), s)| (x - m) / s).collect()
    }

    /// Fit, optionally guided by labels for stratified subsampling when the
    /// batch exceeds `max_samples`. `BaseDetector::fit` calls this with
    /// `labels = None`.
    pub fn fit_with_labels(&mut self, matrix: &FeatureMatrix, labels: Option<&[i8]>) -> DetectorResult<()> {
        if matrix.is_empty() {
            return Err(DetectorError::EmptyInput);
        }
        let arity = matrix.rows[0].len();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let indices: Vec<usize> = if matrix.len() > self.max_samples {
            match labels {
                Some(labels) => stratified_sample_indices(labels, self.max_samples, &mut rng),
                None => uniform_sample_indices(matrix.len(), self.max_samples, &mut rng),
            }
        } else {
            (0..matrix.len()).collect()
        };

        let stats: Vec<(f64, f64)> = (0..arity).map(|j| mean_std(&matrix.column(j))).collect();
        let feature_mean: Vec<f64> = stats.iter().map(|(m, _)| *m).collect();
        let feature_std: Vec<f64> = stats.iter().map(|(_, s)| *s).collect();

        let rows: Vec<Vec<f64>> = indices
            .iter()
            .map(|&i| Self::standardize(&feature_mean, &feature_std, &matrix.rows[i]))
            .collect();

        let gamma = 1.0 / arity as f64;
        let l = rows.len();
        let kernel: Vec<Vec<f64>> = rows
            .iter()
            .map(|a| rows.iter().map(|b| rbf_kernel(a, b, gamma)).collect())
            .collect();

        // 1/(nu*l), capped at 1.0 since alpha can never exceed 1 anyway
        // once sum(alpha) = 1 is enforced.
        let cap = 1.0 / (self.nu() * l as f64).max(1.0);
        let mut alpha = vec![1.0 / l as f64; l];
        for _ in 0..SOLVER_ITERATIONS {
            let gradient: Vec<f64> = (0..l).map(|i| kernel[i].iter().zip(&alpha).map(|(k, a)| k * a).sum()).collect();
            let step: Vec<f64> = alpha.iter().zip(&gradient).map(|(a, g)| a - SOLVER_STEP * g).collect();
            alpha = project_capped_simplex(&step, cap, 1.0);
        }

        let decision: Vec<f64> = (0..l).map(|i| kernel[i].iter().zip(&alpha).map(|(k, a)| k * a).sum()).collect();
        let on_margin: Vec<f64> = alpha
            .iter()
            .zip(&decision)
            .filter(|(a, _)| **a > 1e-6 && **a < cap - 1e-6)
            .map(|(_, d)| *d)
            .collect();
        let rho = if on_margin.is_empty() {
            median(&decision)
        } else {
            on_margin.iter().sum::<f64>() / on_margin.len() as f64
        };

        self.fitted = Some(FittedSvm {
            support_vectors: rows,
            alpha,
            rho,
            gamma,
            feature_mean,
            feature_std,
        });
        Ok(())
    }

    fn decision_function(&self, fitted: &FittedSvm, row: &[f64]) -> f64 {
        let standardized = Self::standardize(&fitted.feature_mean, &fitted.feature_std, row);
        let sum: f64 = fitted
            .support_vectors
            .iter()
            .zip(&fitted.alpha)
            .map(|(sv, a)| a * rbf_kernel(sv, &standardized, fitted.gamma))
            .sum();
        sum - fitted.rho
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    sorted.get(sorted.len() / 2).copied().unwrap_or(0.0)
}

fn uniform_sample_indices(n: usize, target: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..target.min(n) {
        let j = rng.gen_range(i..indices.len());
        indices.swap(i, j);
    }
    indices.into_iter().take(target).collect()
}

/// Proportional allocation per class, remainder given to the classes with
/// the largest fractional leftover
fn stratified_sample_indices(labels: &[i8], target: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut by_class: BTreeMap<i8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let total = labels.len() as f64;
    let mut allocations: Vec<(i8, usize, f64)> = by_class
        .iter()
        .map(|(&class, members)| {
            let exact = target as f64 * members.len() as f64 / total;
            (class, exact.floor() as usize, exact.fract())
        })
        .collect();

    let allocated: usize = allocations.iter().map(|(_, n, _)| n).sum();
    let mut remainder = target.saturating_sub(allocated);
    allocations.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap());
    for (_, n, _) in allocations.iter_mut() {
        if remainder == 0 {
            break;
        }
        *n += 1;
        remainder -= 1;
    }

    let mut result = Vec::with_capacity(target);
    for (class, count, _) in allocations {
        let members = &by_class[&class];
        result.extend(uniform_sample_indices(members.len(), count.min(members.len()), rng).into_iter().map(|i| members[i]));
    }
    result
}

impl BaseDetector for OneClassSvm {
    fn name(&self) -> &'static str {
        "one_class_svm"
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        let mut hyperparameters = BTreeMap::new();
        hyperparameters.insert("nu".to_string(), self.nu().to_string());
        hyperparameters.insert("max_samples".to_string(), self.max_samples.to_string());
        hyperparameters.insert("seed".to_string(), self.seed.to_string());
        hyperparameters
    }

    fn fit(&mut self, matrix: &FeatureMatrix) -> DetectorResult<()> {
        self.fit_with_labels(matrix, None)
    }

    fn predict(&self, matrix: &FeatureMatrix) -> DetectorResult<(Vec<i8>, Vec<f64>)> {
        let fitted = self.fitted.as_ref().ok_or(DetectorError::NotFit)?;
        if matrix.is_empty() {
            return Err(DetectorError::EmptyInput);
        }
        if matrix.rows[0].len() != fitted.feature_mean.len() {
            return Err(DetectorError::ArityMismatch {
                fit: fitted.feature_mean.len(),
                got: matrix.rows[0].len(),
            });
        }

        let mut labels = Vec::with_capacity(matrix.len());
        let mut raw = Vec::with_capacity(matrix.len());
        for row in &matrix.rows {
            let f = self.decision_function(fitted, row);
            labels.push(if f < 0.0 { -1 } else { 1 });
            raw.push(f);
        }
        Ok((labels, raw))
    }

    fn persist(&self) -> DetectorResult<DetectorArtifact> {
        let fitted = self.fitted.as_ref().ok_or(DetectorError::NotFit)?;
        let blob = serde_json::to_vec(fitted).map_err(|e| DetectorError::BadArtifact(e.to_string()))?;
        Ok(DetectorArtifact {
            name: self.name().to_string(),
            feature_arity: fitted.feature_mean.len(),
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
        let fitted: FittedSvm = serde_json::from_slice(&artifact.trained_state_blob)
            .map_err(|e| DetectorError::BadArtifact(e.to_string()))?;
        self.fitted = Some(fitted);
        Ok(())
    }
}
