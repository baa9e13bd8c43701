use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::traits::{DocumentStore, WriteScope};

/// Pseudo-path reported by in-memory load failures.
const MEMORY_PATH: &str = ":memory:";

/// In-memory document store.
///
/// Intended for tests and embedding. The document lives in a `BTreeMap`
/// behind a `RwLock` and is lost when the store is dropped. Commits can be
/// forced to fail and loads can be made to report the store as unavailable,
/// which lets callers exercise their failure paths without a file.
pub struct InMemoryDocumentStore {
    document: RwLock<Document>,
    scope: WriteScope,
    unavailable: Option<String>,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
}

impl InMemoryDocumentStore {
    /// Create a store holding an empty document.
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    /// Create a store holding `document`.
    pub fn with_document(document: Document) -> Self {
        Self {
            document: RwLock::new(document),
            scope: WriteScope::new(),
            unavailable: None,
            fail_commits: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
        }
    }

    /// Create a store whose tables are given as `(name, raw JSON)` pairs.
    pub fn with_tables<I, K, V>(tables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_document(
            tables
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Create a store whose every load fails with `StoreError::Unavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Make subsequent commits fail (`true`) or succeed (`false`).
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of commits attempted so far, failed ones included.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> Document {
        self.document.read().expect("lock poisoned").clone()
    }

    fn check_available(&self) -> StoreResult<()> {
        match &self.unavailable {
            Some(reason) => Err(StoreError::Unavailable {
                path: PathBuf::from(MEMORY_PATH),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load(&self) -> StoreResult<Document> {
        self.check_available()?;
        Ok(self.snapshot())
    }

    async fn insert_table(&self, table: &str, serialized: String) -> StoreResult<()> {
        self.check_available()?;
        let mut document = self.document.write().expect("lock poisoned");
        if document.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        document.insert(table.to_string(), serialized);
        Ok(())
    }

    async fn commit(&self, table: &str, serialized: String) -> bool {
        self.commits.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = self.check_available() {
            warn!(table, error = %e, "commit failed");
            return false;
        }
        if self.fail_commits.load(Ordering::SeqCst) {
            warn!(table, "commit failed: failure injected");
            return false;
        }
        if let Err(e) = serde_json::from_str::<serde_json::Value>(&serialized) {
            warn!(table, error = %e, "commit failed: table is not valid JSON");
            return false;
        }

        let bytes = serialized.len();
        self.document
            .write()
            .expect("lock poisoned")
            .insert(table.to_string(), serialized);
        debug!(table, bytes, "committed table in memory");
        true
    }

    fn write_scope(&self) -> &WriteScope {
        &self.scope
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.document.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryDocumentStore")
            .field("tables", &tables)
            .field("commits", &self.commit_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_returns_seeded_tables() {
        let store = InMemoryDocumentStore::with_tables([("customers", "[]")]);
        let doc = store.load().await.unwrap();
        assert_eq!(doc.get("customers").map(String::as_str), Some("[]"));
    }

    #[tokio::test]
    async fn commit_replaces_table() {
        let store = InMemoryDocumentStore::with_tables([("customers", "[]")]);
        assert!(store.commit("customers", r#"[{"id":1}]"#.into()).await);
        assert_eq!(
            store.table("customers").await.unwrap().as_deref(),
            Some(r#"[{"id":1}]"#)
        );
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn injected_failure_leaves_document_untouched() {
        let store = InMemoryDocumentStore::with_tables([("customers", "[]")]);
        store.set_fail_commits(true);
        assert!(!store.commit("customers", r#"[{"id":1}]"#.into()).await);
        assert_eq!(store.snapshot()["customers"], "[]");
        assert_eq!(store.commit_count(), 1);

        store.set_fail_commits(false);
        assert!(store.commit("customers", r#"[{"id":1}]"#.into()).await);
    }

    #[tokio::test]
    async fn invalid_json_commit_fails() {
        let store = InMemoryDocumentStore::new();
        assert!(!store.commit("customers", "[{".into()).await);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_loads_and_commits() {
        let store = InMemoryDocumentStore::unavailable("disk on fire");
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
        assert!(!store.commit("customers", "[]".into()).await);
    }

    #[tokio::test]
    async fn insert_table_rejects_existing_name() {
        let store = InMemoryDocumentStore::new();
        store.insert_table("customers", "[]".into()).await.unwrap();
        let err = store.insert_table("customers", "[]".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::TableExists(name) if name == "customers"));
    }

    #[tokio::test]
    async fn table_names_are_sorted() {
        let store = InMemoryDocumentStore::with_tables([("orders", "[]"), ("customers", "[]")]);
        assert_eq!(store.table_names().await.unwrap(), vec!["customers", "orders"]);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryDocumentStore::with_tables([("customers", "[]")]);
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryDocumentStore"));
        assert!(debug.contains("tables"));
    }
}
