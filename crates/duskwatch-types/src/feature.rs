use std::collections::BTreeMap;

/// Fixed width of a `FeatureVector` row
pub const FEATURE_ARITY: usize = 20;

/// Feature schema, position-for-position with the extractor's output.
pub const FEATURE_NAMES: [&str; FEATURE_ARITY] = [
    "hour_of_day",
    "day_of_week",
    "after_hours",
    "severity_level",
    "source_encoded",
    "source_risk",
    "event_type_encoded",
    "message_length",
    "word_count",
    "keyword_risk",
    "event_id_hash",
    "has_username",
    "has_hostname",
    "has_process",
    "process_id_norm",
    "has_failure_signal",
    "has_privilege_signal",
    "has_auth_signal",
    "has_ip_address",
    "has_port_number",
];

/// One row of the fixed-width numeric feature matrix.
pub type FeatureRow = [f64; FEATURE_ARITY];

/// The N×20 numeric matrix produced by feature extraction for one chunk.
///
/// Owned by the Session Manager for the lifetime of a chunk; never
/// persisted
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column `j` across every row, as a freestanding vector (used by
    /// detectors that need column-wise statistics).
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[j]).collect()
    }

    /// Named feature map for a single row (used for `Anomaly::feature_snapshot`).
    pub fn row_as_map(&self, idx: usize) -> BTreeMap<String, f64> {
        let row = &self.rows[idx];
        FEATURE_NAMES
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }
}
