use thiserror::Error;

#[derive(Debug, Error)]
pub enum TailerError {
    #[error("cannot open {path}: {source}")]
    Open { path: String, #[source] source: std::io::Error },

    #[error("cannot stat {path}: {source}")]
    Stat { path: String, #[source] source: std::io::Error },

    #[error("{path} is not currently watched")]
    NotWatched { path: String },

    #[error("store error: {0}")]
    Store(#[from] duskwatch_store::StoreError),
}

pub type TailerResult<T> = Result<T, TailerError>;

impl From<TailerError> for duskwatch_types::CoreError {
    fn from(err: TailerError) -> Self {
        match err {
            TailerError::Store(inner) => duskwatch_types::CoreError::Database(inner.to_string()),
            other => duskwatch_types::CoreError::Parser(other.to_string()),
        }
    }
}
