use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an `AnalysisSession`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an `AnalysisSession`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

/// `{session_id, start_time, end_time?, status, logs_analyzed,
/// anomalies_detected, parameters_json, metadata_json}`
///
/// Created at session start; closed exactly once; never mutated afterwards
/// once in a terminal state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub session_id: SessionId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub logs_analyzed: u64,
    pub anomalies_detected: u64,
    pub parameters_json: serde_json::Value,
    pub metadata_json: serde_json::Value,
}

impl AnalysisSession {
    /// Open a new session in the `running` state.
    pub fn open(parameters_json: serde_json::Value) -> Self {
        Self {
            session_id: SessionId::new(),
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::Running,
            logs_analyzed: 0,
            anomalies_detected: 0,
            parameters_json,
            metadata_json: serde_json::json!({}),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, SessionStatus::Running)
    }
}
