use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::severity::Severity;

/// Stable identifier for a persisted `LogRecord`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogRecordId(pub Uuid);

impl LogRecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LogRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LogRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ingress record produced by an external source-file parser.
///
/// Immutable once constructed; owned by the persistent store. Every field
/// beyond `timestamp` and `message` is optional because collaborator
/// parsers observe heterogeneous OS event formats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: LogRecordId,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub severity: Severity,
    /// The severity text a collaborator parser observed before folding,
    /// e.g. `"WARNING"`. Kept alongside the folded `severity` because some
    /// synonyms the fold collapses together (`WARN`/`WARNING` vs `MEDIUM`)
    /// are still scored differently downstream.
    pub raw_severity: Option<String>,
    pub message: String,
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub process_name: Option<String>,
    pub process_id: Option<i64>,
    pub raw: String,
    pub metadata: BTreeMap<String, String>,
}

impl LogRecord {
    /// Construct a new record, deriving `raw` from `message` when the
    /// caller has no separate original text.
    pub fn new(timestamp: DateTime<Utc>, source: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: LogRecordId::new(),
            timestamp,
            source: source.into(),
            event_id: None,
            event_type: None,
            severity: Severity::Info,
            raw_severity: None,
            raw: message.clone(),
            message,
            hostname: None,
            username: None,
            process_name: None,
            process_id: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Parse and fold `raw` into `severity`, retaining the original text in
    /// `raw_severity` for consumers that distinguish synonyms the fold
    /// collapses together.
    pub fn with_raw_severity(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.severity = raw.parse().expect("Severity::from_str is infallible");
        self.raw_severity = Some(raw);
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_process(mut self, name: impl Into<String>, pid: Option<i64>) -> Self {
        self.process_name = Some(name.into());
        self.process_id = pid;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_are_sane() {
        let rec = LogRecord::new(Utc::now(), "sshd", "Failed password for root");
        assert_eq!(rec.severity, Severity::Info);
        assert_eq!(rec.raw, rec.message);
        assert!(rec.event_id.is_none());
        assert!(rec.raw_severity.is_none());
    }

    #[test]
    fn with_raw_severity_folds_and_retains_original_text() {
        let rec = LogRecord::new(Utc::now(), "sshd", "quiet").with_raw_severity("WARNING");
        assert_eq!(rec.severity, Severity::Medium);
        assert_eq!(rec.raw_severity.as_deref(), Some("WARNING"));
    }
}
