use std::path::PathBuf;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing document cannot be opened exclusively or is not a JSON
    /// object of tables.
    #[error("document store unavailable at {}: {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },

    /// A table was inserted under a name the document already holds.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Unavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
