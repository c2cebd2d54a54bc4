//! Base Detectors (C3): pluggable anomaly-scoring algorithms that all
//! share the `fit`/`predict`/`fit_predict`/`persist`/`restore` contract
//! the Ensemble Orchestrator (C5) drives them through.

#![deny(unsafe_code)]

mod error;
mod isolation_forest;
mod one_class_svm;
mod scoring;
mod statistical;
mod trait_def;

pub use error::{DetectorError, DetectorResult};
pub use isolation_forest::IsolationForest;
pub use one_class_svm::OneClassSvm;
pub use scoring::{mean_std, normalize};
pub use statistical::{Statistical, StatisticalMethod};
pub use trait_def::BaseDetector;
