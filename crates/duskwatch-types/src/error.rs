use thiserror::Error;

/// Result alias used across every duskwatch crate's public boundary.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error kinds surfaced by the core analysis pipeline
///
/// Individual crates may define a narrower, crate-local error enum for
/// their own internal plumbing, but every public boundary ultimately
/// converts into one of these variants.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A log-source collaborator (EVTX/syslog parser) failed.
    #[error("parser error: {0}")]
    Parser(String),

    /// The persistent analytical store rejected or failed an operation.
    #[error("database error: {0}")]
    Database(String),

    /// A contract violation: null required input, malformed time range, etc.
    #[error("validation error: {0}")]
    Validation(String),

    /// Any cryptographic failure: signing, verification, key loading.
    #[error("security error: {0}")]
    Security(String),

    /// A modeling failure inside a base detector or the ensemble.
    #[error("ai engine error: {0}")]
    AiEngine(String),

    /// A SOUP/update envelope failed validation.
    #[error("update error: {0}")]
    Update(String),

    /// Process-wide configuration was missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
}
