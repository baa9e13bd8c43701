use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::document::Document;
use crate::error::StoreResult;

/// Store-wide exclusive scope for read-modify-write sequences.
///
/// Every table lives in the same physical document, so two mutations on
/// different tables still rewrite the same file. Repositories enter this
/// scope before reading their cache for a mutation and leave it only after
/// the commit result has been applied.
#[derive(Debug, Default)]
pub struct WriteScope {
    lock: Mutex<()>,
}

/// Proof of holding a [`WriteScope`]. The scope is released on drop.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl WriteScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the scope is free and enter it.
    pub async fn enter(&self) -> WriteGuard<'_> {
        WriteGuard {
            _guard: self.lock.lock().await,
        }
    }

    /// Enter the scope only if nobody holds it.
    pub fn try_enter(&self) -> Option<WriteGuard<'_>> {
        self.lock
            .try_lock()
            .ok()
            .map(|guard| WriteGuard { _guard: guard })
    }
}

/// Owner of the shared document.
///
/// All implementations must satisfy these invariants:
/// - The document is loaded at most once per instance; later loads return
///   the cached mapping.
/// - `commit` rewrites the entire document, and only replaces the in-memory
///   entry when the rewrite succeeded.
/// - `commit` never returns an error; any failure is logged and reported as
///   `false`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Snapshot of the current table mapping, loading it on first use.
    ///
    /// Returns `Err(StoreError::Unavailable)` when the backing storage cannot
    /// be opened exclusively or does not hold a JSON object.
    async fn load(&self) -> StoreResult<Document>;

    /// Add a new table entry to the in-memory document.
    ///
    /// Fails with `StoreError::TableExists` if the name is already taken.
    /// The entry becomes durable with the next commit.
    async fn insert_table(&self, table: &str, serialized: String) -> StoreResult<()>;

    /// Replace `table` with `serialized` and durably rewrite the document.
    async fn commit(&self, table: &str, serialized: String) -> bool;

    /// The store-wide scope mutating callers must hold.
    fn write_scope(&self) -> &WriteScope;

    /// Raw text of one table, if the document has it.
    async fn table(&self, table: &str) -> StoreResult<Option<String>> {
        Ok(self.load().await?.remove(table))
    }

    /// Names of every table in the document, sorted.
    async fn table_names(&self) -> StoreResult<Vec<String>> {
        Ok(self.load().await?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_scope_is_exclusive() {
        let scope = WriteScope::new();
        let guard = scope.enter().await;
        assert!(scope.try_enter().is_none());
        drop(guard);
        assert!(scope.try_enter().is_some());
    }
}
