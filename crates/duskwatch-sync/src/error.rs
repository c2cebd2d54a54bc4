use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] duskwatch_store::StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] duskwatch_crypto::CryptoError),

    #[error("package I/O error: {0}")]
    Io(String),

    #[error("malformed package: {0}")]
    Malformed(String),

    #[error("signature verification failed")]
    SignatureInvalid,
}

pub type SyncResult<T> = Result<T, SyncError>;

impl From<SyncError> for duskwatch_types::CoreError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::Store(inner) => duskwatch_types::CoreError::Database(inner.to_string()),
            SyncError::Crypto(inner) => duskwatch_types::CoreError::Security(inner.to_string()),
            SyncError::SignatureInvalid => duskwatch_types::CoreError::Security(message),
            other => duskwatch_types::CoreError::Validation(other.to_string()),
        }
    }
}
