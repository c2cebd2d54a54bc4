use thiserror::Error;

/// Errors surfaced by the ensemble orchestrator.
#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("empty input batch")]
    EmptyInput,

    #[error("model store error: {0}")]
    Store(#[from] duskwatch_store::StoreError),

    #[error("detector failure: {0}")]
    Detector(String),

    #[error("worker pool join error: {0}")]
    Join(String),
}

pub type EnsembleResult<T> = Result<T, EnsembleError>;

impl From<EnsembleError> for duskwatch_types::CoreError {
    fn from(err: EnsembleError) -> Self {
        duskwatch_types::CoreError::AiEngine(err.to_string())
    }
}
