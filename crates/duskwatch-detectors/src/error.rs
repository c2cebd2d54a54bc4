use thiserror::Error;

pub type DetectorResult<T> = Result<T, DetectorError>;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector has not been fit yet")]
    NotFit,

    #[error("empty feature matrix")]
    EmptyInput,

    #[error("feature arity mismatch: detector fit on {fit}, got {got}")]
    ArityMismatch { fit: usize, got: usize },

    #[error("artifact corrupt or incompatible: {0}")]
    BadArtifact(String),
}

impl From<DetectorError> for duskwatch_types::CoreError {
    fn from(err: DetectorError) -> Self {
        duskwatch_types::CoreError::AiEngine(err.to_string())
    }
}
