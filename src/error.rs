use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("cannot read directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("embedding model '{model}' is unavailable: {reason}")]
    ModelUnavailable { model: String, reason: String },

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "embedding matrix has {rows} rows but the corpus has {documents} documents"
    )]
    Integrity { rows: usize, documents: usize },

    #[error("invalid answer '{0}', expected y or n")]
    InvalidContinueInput(String),

    #[error("query is empty")]
    EmptyQuery,

    #[error("input closed")]
    InputClosed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    /// Whether the session controller should re-prompt instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DirectoryNotFound(_)
                | Error::DirectoryUnreadable { .. }
                | Error::InvalidContinueInput(_)
                | Error::EmptyQuery
        )
    }
}

impl From<candle_core::Error> for Error {
    fn from(e: candle_core::Error) -> Self {
        Error::Embedding(format!("tensor computation error: {e}"))
    }
}
