use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::log_record::LogRecordId;
use crate::severity::SeverityBand;

/// `{name, feature_arity, hyperparameters, trained_state_blob, integrity_tag}`
/// Persisted and restored by the Model Store (C2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorArtifact {
    pub name: String,
    pub feature_arity: usize,
    /// Canonicalized hyperparameters, stable key order.
    pub hyperparameters: BTreeMap<String, String>,
    pub trained_state_blob: Vec<u8>,
    pub integrity_tag: String,
}

/// Which base algorithm (or the keyword heuristic) produced a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    IsolationForest,
    OneClassSvm,
    Statistical,
    Keyword,
    Ensemble,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Algorithm::IsolationForest => "isolation_forest",
            Algorithm::OneClassSvm => "one_class_svm",
            Algorithm::Statistical => "statistical",
            Algorithm::Keyword => "keyword",
            Algorithm::Ensemble => "ensemble",
        };
        write!(f, "{s}")
    }
}

/// Stable identifier for a persisted `Anomaly`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnomalyId(pub Uuid);

impl AnomalyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnomalyId {
    fn default() -> Self {
        Self::new()
    }
}

/// `{log_ref, score, algorithm, severity, feature_snapshot, explanation,
/// technique_id?, tactic?, detected_at}` Created by C5+C6;
/// persisted exactly once per session per `log_ref`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: AnomalyId,
    pub log_ref: LogRecordId,
    /// Calibrated score in `[0.1, 0.99]`.
    pub score: f64,
    pub algorithm: Algorithm,
    pub severity: SeverityBand,
    pub feature_snapshot: BTreeMap<String, f64>,
    pub explanation: String,
    pub technique_id: Option<String>,
    pub tactic: Option<String>,
    pub detected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_display_matches_weight_table_keys() {
        assert_eq!(Algorithm::IsolationForest.to_string(), "isolation_forest");
        assert_eq!(Algorithm::OneClassSvm.to_string(), "one_class_svm");
        assert_eq!(Algorithm::Statistical.to_string(), "statistical");
        assert_eq!(Algorithm::Keyword.to_string(), "keyword");
    }
}
