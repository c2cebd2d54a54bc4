use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("store error: {0}")]
    Store(#[from] duskwatch_store::StoreError),

    #[error("feature extraction failed: {0}")]
    Features(#[from] duskwatch_features::FeatureExtractionError),

    #[error("ensemble failure: {0}")]
    Ensemble(#[from] duskwatch_ensemble::EnsembleError),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<SessionError> for duskwatch_types::CoreError {
    fn from(err: SessionError) -> Self {
        duskwatch_types::CoreError::AiEngine(err.to_string())
    }
}
