//! Shared data model and error types for the duskwatch analysis pipeline.
//!
//! Every other `duskwatch-*` crate depends on this one for the types that
//! cross component boundaries: `LogRecord`, `FeatureMatrix`, `Anomaly`,
//! `AnalysisSession`, `StreamEvent`, `NodeRecord`, `SyncPackage`,
//! `HubAnomaly`, and the shared `CoreError`.

#![deny(unsafe_code)]

mod anomaly;
mod config;
mod error;
mod feature;
mod log_record;
mod node;
mod session;
mod severity;
mod stream_event;
mod sync_package;
mod tables;

pub use anomaly::{Algorithm, Anomaly, AnomalyId, DetectorArtifact};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use feature::{FeatureMatrix, FeatureRow, FEATURE_ARITY, FEATURE_NAMES};
pub use log_record::{LogRecord, LogRecordId};
pub use node::{NodeId, NodeRecord, NodeRole, NodeStatus, NodeTotals, SyncMethod};
pub use session::{AnalysisSession, SessionId, SessionStatus};
pub use severity::{Severity, SeverityBand};
pub use stream_event::StreamEvent;
pub use tables::{keyword_risk, source_risk, DEFAULT_SOURCE_RISK, KEYWORD_WEIGHTS, SOURCE_WEIGHTS};
pub use sync_package::{
    ExportedAnomaly, HubAnomaly, LogsSummary, PackageId, SyncLogEntry, SyncPackage,
    TechniqueCorrelation, ThreatLevel, MAX_PACKAGE_ANOMALIES,
};
