use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::severity::SeverityBand;

/// `{file, raw_line, parsed_fields, score, severity, received_at}`
///
/// Single-consumer hand-off with bounded retention; produced by the
/// Real-Time Tailer (C8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamEvent {
    pub file: String,
    pub raw_line: String,
    pub parsed_fields: BTreeMap<String, String>,
    pub score: f64,
    pub severity: SeverityBand,
    pub received_at: DateTime<Utc>,
}
