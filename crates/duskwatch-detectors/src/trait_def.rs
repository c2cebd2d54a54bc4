use std::collections::BTreeMap;

use duskwatch_types::{DetectorArtifact, FeatureMatrix};

use crate::error::DetectorResult;

/// A pluggable base anomaly-scoring algorithm
///
/// Labels are `-1` for an anomaly, `+1` for an inlier. Raw scores are
/// detector-specific; callers that need a comparable `[0, 1]` anomaly
/// surface should run them through [`crate::scoring::normalize`].
pub trait BaseDetector: Send + Sync {
    /// Stable name used as the Model Store key and the ensemble's weight
    /// table lookup
    fn name(&self) -> &'static str;

    /// Canonicalized hyperparameters for this configuration, independent of
    /// whether the detector has been fit yet. Used both by `persist` and
    /// by Model Store restore-eligibility checks
    fn hyperparameters(&self) -> BTreeMap<String, String>;

    fn fit(&mut self, matrix: &FeatureMatrix) -> DetectorResult<()>;

    fn predict(&self, matrix: &FeatureMatrix) -> DetectorResult<(Vec<i8>, Vec<f64>)>;

    fn fit_predict(&mut self, matrix: &FeatureMatrix) -> DetectorResult<(Vec<i8>, Vec<f64>)> {
        self.fit(matrix)?;
        self.predict(matrix)
    }

    fn persist(&self) -> DetectorResult<DetectorArtifact>;

    fn restore(&mut self, artifact: &DetectorArtifact) -> DetectorResult<()>;
}
