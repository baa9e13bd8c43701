use docstore_store::StoreError;
use docstore_types::EntityId;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The document store could not be loaded.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// More than one record shares an id that must be unique.
    #[error("{count} records in table {table} share id {id}")]
    MultipleMatches {
        table: String,
        id: EntityId,
        count: usize,
    },

    /// The table's text is not a JSON list of the expected record type.
    #[error("table {table} cannot be read: {reason}")]
    CorruptTable { table: String, reason: String },

    /// A missing table could not be created in the document.
    #[error("table {table} cannot be created: {reason}")]
    Schema { table: String, reason: String },

    /// The caller cancelled the operation before it committed anything.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;
