//! Ensemble Orchestrator (C5): single-algorithm restore/fit/blend and
//! concurrent multi-detector fan-out, plus the canonical score-calibration
//! surface every downstream severity band reads from.

#![deny(unsafe_code)]

mod calibration;
mod error;
mod orchestrator;

pub use calibration::calibrate;
pub use error::{EnsembleError, EnsembleResult};
pub use orchestrator::{run_ensemble, run_single, EnsembleConfig, EnsembleOutput, LABEL_PERCENTILE};
