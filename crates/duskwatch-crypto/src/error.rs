use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Crypto-layer errors; every variant maps onto `CoreError::Security` (or
/// `CoreError::Update` for the SOUP envelope) at the public boundary.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("malformed key material: {0}")]
    MalformedKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("update envelope is missing field: {0}")]
    UpdateEnvelopeMissingField(&'static str),

    #[error("update payload hash mismatch")]
    UpdateHashMismatch,

    #[error("io error: {0}")]
    Io(String),
}

impl From<CryptoError> for duskwatch_types::CoreError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::UpdateEnvelopeMissingField(_) | CryptoError::UpdateHashMismatch => {
                duskwatch_types::CoreError::Update(e.to_string())
            }
            other => duskwatch_types::CoreError::Security(other.to_string()),
        }
    }
}
