use std::collections::BTreeMap;

use duskwatch_types::{DetectorArtifact, FeatureMatrix};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DetectorError, DetectorResult};
use crate::trait_def::BaseDetector;

const DEFAULT_TREE_COUNT: usize = 100;
const DEFAULT_SUBSAMPLE_CAP: usize = 256;
const DEFAULT_SEED: u64 = 42;

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Node {
    Leaf { size: usize },
    Internal { feature: usize, value: f64, left: Box<Node>, right: Box<Node> },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Tree {
    root: Node,
}

fn build_tree(rng: &mut ChaCha8Rng, rows: &[&[f64]], depth: usize, max_depth: usize) -> Node {
    if rows.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: rows.len() };
    }

    let arity = rows[0].len();
    let feature = rng.gen_range(0..arity);
    let (min, max) = rows
        .iter()
        .map(|r| r[feature])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if (max - min).abs() < 1e-12 {
        return Node::Leaf { size: rows.len() };
    }

    let split = rng.gen_range(min..max);
    let (left, right): (Vec<&[f64]>, Vec<&[f64]>) = rows.iter().partition(|r| r[feature] < split);

    if left.is_empty() || right.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    Node::Internal {
        feature,
        value: split,
        left: Box::new(build_tree(rng, &left, depth + 1, max_depth)),
        right: Box::new(build_tree(rng, &right, depth + 1, max_depth)),
    }
}

/// Average path length of an unbuilt binary search tree over `n` points
/// (Liu, Ting & Zhou 2008), used to normalize isolation-forest path
/// lengths into a bounded anomaly score.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * (harmonic(n - 1.0)) - (2.0 * (n - 1.0) / n)
}

fn harmonic(x: f64) -> f64 {
    const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;
    if x <= 0.0 {
        0.0
    } else {
        x.ln() + EULER_MASCHERONI
    }
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Internal { feature, value, left, right } => {
            if row[*feature] < *value {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FittedForest {
    trees: Vec<Tree>,
    subsample_size: usize,
    feature_arity: usize,
    score_threshold: f64,
}

/// Tree-ensemble anomaly detector: isolates points by recursive random
/// splits and scores each point by how quickly it separates from the rest
///
pub struct IsolationForest {
    contamination: f64,
    tree_count: usize,
    subsample_cap: usize,
    seed: u64,
    fitted: Option<FittedForest>,
}

impl IsolationForest {
    pub fn new(contamination: f64, seed: u64) -> Self {
        Self {
            contamination,
            tree_count: DEFAULT_TREE_COUNT,
            subsample_cap: DEFAULT_SUBSAMPLE_CAP,
            seed,
            fitted: None,
        }
    }

    /// Uniform weights, since this implementation does not expose
    /// per-tree split-count importance.
    pub fn feature_importance(&self) -> Vec<f64> {
        let arity = self.fitted.as_ref().map(|f| f.feature_arity).unwrap_or(0);
        if arity == 0 {
            return Vec::new();
        }
        vec![1.0 / arity as f64; arity]
    }

    fn score_row(&self, forest: &FittedForest, row: &[f64]) -> f64 {
        let avg_path = forest
            .trees
            .iter()
            .map(|t| path_length(&t.root, row, 0))
            .sum::<f64>()
            / forest.trees.len() as f64;
        let c = average_path_length(forest.subsample_size).max(1e-9);
        2f64.powf(-avg_path / c)
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(0.1, DEFAULT_SEED)
    }
}

impl BaseDetector for IsolationForest {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        let mut hyperparameters = BTreeMap::new();
        hyperparameters.insert("tree_count".to_string(), self.tree_count.to_string());
        hyperparameters.insert("subsample_cap".to_string(), self.subsample_cap.to_string());
        hyperparameters.insert("contamination".to_string(), self.contamination.to_string());
        hyperparameters.insert("seed".to_string(), self.seed.to_string());
        hyperparameters
    }

    fn fit(&mut self, matrix: &FeatureMatrix) -> DetectorResult<()> {
        if matrix.is_empty() {
            return Err(DetectorError::EmptyInput);
        }
        let arity = matrix.rows[0].len();
        let subsample_size = matrix.len().min(self.subsample_cap);
        let max_depth = (subsample_size.max(2) as f64).log2().ceil() as usize;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let all_rows: Vec<&[f64]> = matrix.rows.iter().map(|r| r.as_slice()).collect();

        let trees = (0..self.tree_count)
            .map(|_| {
                let sample = sample_without_replacement(&mut rng, &all_rows, subsample_size);
                Tree { root: build_tree(&mut rng, &sample, 0, max_depth) }
            })
            .collect();

        let forest = FittedForest { trees, subsample_size, feature_arity: arity, score_threshold: 0.5 };
        let mut scores: Vec<f64> = matrix.rows.iter().map(|r| self.score_row(&forest, r)).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = (((1.0 - self.contamination) * scores.len() as f64).floor() as usize)
            .min(scores.len() - 1);
        let threshold = scores[idx];

        debug!(tree_count = self.tree_count, subsample_size, threshold, "fitted isolation forest");
        self.fitted = Some(FittedForest { score_threshold: threshold, ..forest });
        Ok(())
    }

    fn predict(&self, matrix: &FeatureMatrix) -> DetectorResult<(Vec<i8>, Vec<f64>)> {
        let forest = self.fitted.as_ref().ok_or(DetectorError::NotFit)?;
        if matrix.is_empty() {
            return Err(DetectorError::EmptyInput);
        }
        if matrix.rows[0].len() != forest.feature_arity {
            return Err(DetectorError::ArityMismatch { fit: forest.feature_arity, got: matrix.rows[0].len() });
        }

        let mut labels = Vec::with_capacity(matrix.len());
        let mut raw = Vec::with_capacity(matrix.len());
        for row in &matrix.rows {
            let score = self.score_row(forest, row);
            labels.push(if score >= forest.score_threshold { -1 } else { 1 });
            raw.push(-score);
        }
        Ok((labels, raw))
    }

    fn persist(&self) -> DetectorResult<DetectorArtifact> {
        let forest = self.fitted.as_ref().ok_or(DetectorError::NotFit)?;
        let blob = serde_json::to_vec(forest).map_err(|e| DetectorError::BadArtifact(e.to_string()))?;
        Ok(DetectorArtifact {
            name: self.name().to_string(),
            feature_arity: forest.feature_arity,
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
        let forest: FittedForest = serde_json::from_slice(&artifact.trained_state_blob)
            .map_err(|e| DetectorError::BadArtifact(e.to_string()))?;
        debug!(tree_count = forest.trees.len(), "restored isolation forest from artifact");
        self.fitted = Some(forest);
        Ok(())
    }
}

fn sample_without_replacement<'a>(rng: &mut ChaCha8Rng, rows: &[&'a [f64]], n: usize) -> Vec<&'a [f64]> {
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    for i in 0..n.min(indices.len()) {
        let j = rng.gen_range(i..indices.len());
        indices.swap(i, j);
    }
    indices.into_iter().take(n).map(|i| rows[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_with_outlier() -> FeatureMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut rows = Vec::new();
        for _ in 0..200 {
            let mut row = [0.0; 20];
            for v in row.iter_mut() {
                *v = rng.gen_range(-1.0..1.0);
            }
            rows.push(row);
        }
        let mut outlier = [0.0; 20];
        outlier.fill(50.0);
        rows.push(outlier);
        FeatureMatrix::new(rows)
    }

    #[test]
    fn deterministic_given_same_seed() {
        let matrix = matrix_with_outlier();
        let mut a = IsolationForest::new(0.05, 123);
        let mut b = IsolationForest::new(0.05, 123);
        let (labels_a, scores_a) = a.fit_predict(&matrix).unwrap();
        let (labels_b, scores_b) = b.fit_predict(&matrix).unwrap();
        assert_eq!(labels_a, labels_b);
        assert_eq!(scores_a, scores_b);
    }

    #[test]
    fn flags_obvious_outlier() {
        let matrix = matrix_with_outlier();
        let mut forest = IsolationForest::new(0.05, 123);
        let (labels, _) = forest.fit_predict(&matrix).unwrap();
        assert_eq!(labels[matrix.len() - 1], -1);
    }

    #[test]
    fn persist_restore_round_trip() {
        let matrix = matrix_with_outlier();
        let mut forest = IsolationForest::new(0.05, 123);
        forest.fit(&matrix).unwrap();
        let artifact = forest.persist().unwrap();

        let mut restored = IsolationForest::new(0.05, 123);
        restored.restore(&artifact).unwrap();
        let (labels, _) = restored.predict(&matrix).unwrap();
        assert_eq!(labels[matrix.len() - 1], -1);
    }

    #[test]
    fn feature_importance_is_uniform() {
        let matrix = matrix_with_outlier();
        let mut forest = IsolationForest::new(0.05, 123);
        forest.fit(&matrix).unwrap();
        let importance = forest.feature_importance();
        assert_eq!(importance.len(), 20);
        assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
