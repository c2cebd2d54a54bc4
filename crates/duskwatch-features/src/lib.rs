//! Feature Extractor (C1): turns a batch of `LogRecord`s into the
//! fixed-width numeric matrix the detectors train and score against.
//!
//! Encoder tables are rebuilt per batch and never persisted — indices are
//! only stable within the batch that produced them.

#![deny(unsafe_code)]

mod encoder;
mod error;
mod extractor;

pub use encoder::EncoderTables;
pub use error::{FeatureExtractionError, FeatureResult};
pub use extractor::extract_features;
