use thiserror::Error;

pub type FeatureResult<T> = Result<T, FeatureExtractionError>;

/// Raised only on memory exhaustion or malformed inputs the caller
/// promised were valid (a contract violation). Ordinary missing optional
/// fields are never an error.
#[derive(Debug, Error)]
pub enum FeatureExtractionError {
    #[error("contract violation: {0}")]
    ContractViolation(String),
}
