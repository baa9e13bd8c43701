use std::fs::{File, OpenOptions, TryLockError};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::task;
use tracing::{debug, info, warn};

use crate::config::{StoreConfig, SyncMode};
use crate::document::{parse_document, render_document, Document};
use crate::error::{StoreError, StoreResult};
use crate::traits::{DocumentStore, WriteScope};

/// Serializes exclusive-open attempts across every store in the process.
static OPEN_LOCK: RwLock<()> = RwLock::new(());

/// Open `path` for read/write and take an exclusive advisory lock on it.
fn open_exclusive(path: &Path) -> StoreResult<File> {
    let _open = OPEN_LOCK.write().unwrap_or_else(PoisonError::into_inner);

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| StoreError::unavailable(path, e))?;

    match file.try_lock() {
        Ok(()) => {
            info!(path = %path.display(), "document file opened");
            Ok(file)
        }
        Err(TryLockError::WouldBlock) => Err(StoreError::unavailable(
            path,
            "file is locked by another holder",
        )),
        Err(TryLockError::Error(e)) => Err(StoreError::unavailable(path, e)),
    }
}

/// Mutable state shared with blocking tasks.
struct FileState {
    path: PathBuf,
    file: Option<File>,
    document: Option<Document>,
}

impl FileState {
    /// The open handle, opening it on first use.
    fn handle(&mut self) -> StoreResult<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => open_exclusive(&self.path)?,
        };
        Ok(self.file.insert(file))
    }

    /// The loaded document, reading it on first use.
    fn document(&mut self) -> StoreResult<&Document> {
        let document = match self.document.take() {
            Some(document) => document,
            None => self.read_document()?,
        };
        Ok(self.document.insert(document))
    }

    fn read_document(&mut self) -> StoreResult<Document> {
        let path = self.path.clone();
        let file = self.handle()?;

        let mut text = String::new();
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_to_string(&mut text))
            .map_err(|e| StoreError::unavailable(&path, e))?;

        let document = parse_document(&text).map_err(|e| {
            StoreError::unavailable(&path, format!("not a JSON object of tables: {e}"))
        })?;
        debug!(path = %path.display(), tables = document.len(), "document loaded");
        Ok(document)
    }

    /// Replace one table and rewrite the whole file. Returns bytes written.
    ///
    /// The in-memory document only changes once the write has succeeded.
    fn commit(&mut self, config: &StoreConfig, table: &str, serialized: String) -> StoreResult<usize> {
        let mut candidate = self.document()?.clone();
        candidate.insert(table.to_string(), serialized);
        let rendered = render_document(&candidate, config.pretty)?;

        let file = self.handle()?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(rendered.as_bytes())?;
        file.flush()?;
        if matches!(config.sync_mode, SyncMode::EveryWrite) {
            file.sync_all()?;
        }

        self.document = Some(candidate);
        Ok(rendered.len())
    }

    fn insert_table(&mut self, table: &str, serialized: String) -> StoreResult<()> {
        self.document()?;
        let document = self.document.get_or_insert_with(Document::new);
        if document.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        document.insert(table.to_string(), serialized);
        Ok(())
    }
}

impl Drop for FileState {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), "document file released");
        }
    }
}

/// Document store backed by a single JSON file.
///
/// The file must already exist. It is opened for read/write with an
/// exclusive lock, either eagerly by [`FileDocumentStore::open`] or on the
/// first load by [`FileDocumentStore::new`], and that one handle serves every
/// load and commit until the store is dropped. File work runs on tokio's
/// blocking pool; a commit that has started writing finishes even if its
/// caller goes away.
pub struct FileDocumentStore {
    config: StoreConfig,
    state: Arc<Mutex<FileState>>,
    scope: WriteScope,
}

impl FileDocumentStore {
    /// Create a store that opens its file lazily on first use.
    pub fn new(config: StoreConfig) -> Self {
        let state = FileState {
            path: config.path.clone(),
            file: None,
            document: None,
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
            scope: WriteScope::new(),
        }
    }

    /// Create a store and acquire its file immediately.
    ///
    /// Blocks the calling thread for the duration of the open.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let store = Self::new(config);
        store.lock_state().handle()?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Whether the backing file handle is currently held.
    pub fn is_open(&self) -> bool {
        self.lock_state().file.is_some()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FileState> {
        self.state.lock().expect("document state mutex poisoned")
    }

    /// Run `f` against the shared state on the blocking pool.
    async fn with_state<R, F>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut FileState) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let state = Arc::clone(&self.state);
        task::spawn_blocking(move || {
            let mut state = state.lock().expect("document state mutex poisoned");
            f(&mut *state)
        })
        .await
        .map_err(|e| StoreError::unavailable(&self.config.path, format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load(&self) -> StoreResult<Document> {
        self.with_state(|state| state.document().cloned()).await
    }

    async fn insert_table(&self, table: &str, serialized: String) -> StoreResult<()> {
        let name = table.to_string();
        self.with_state(move |state| state.insert_table(&name, serialized))
            .await?;
        debug!(table, "table added to document");
        Ok(())
    }

    async fn commit(&self, table: &str, serialized: String) -> bool {
        let config = self.config.clone();
        let name = table.to_string();
        match self
            .with_state(move |state| state.commit(&config, &name, serialized))
            .await
        {
            Ok(bytes) => {
                debug!(table, bytes, path = %self.config.path.display(), "committed table");
                true
            }
            Err(e) => {
                warn!(table, error = %e, path = %self.config.path.display(), "commit failed");
                false
            }
        }
    }

    fn write_scope(&self) -> &WriteScope {
        &self.scope
    }
}

impl std::fmt::Debug for FileDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDocumentStore")
            .field("path", &self.config.path)
            .field("sync_mode", &self.config.sync_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_doc(dir: &tempfile::TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("database.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[tokio::test]
    async fn load_reads_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, r#"{"customers":[{"id":1,"name":"Alice"}]}"#);
        let store = FileDocumentStore::new(StoreConfig::new(&path));

        let doc = store.load().await.unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc["customers"], r#"[{"id":1,"name":"Alice"}]"#);
    }

    #[tokio::test]
    async fn load_is_cached_after_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, r#"{"customers":[]}"#);
        let store = FileDocumentStore::new(StoreConfig::new(&path));
        store.load().await.unwrap();

        // Out-of-band edits are not observed once loaded.
        std::fs::write(&path, r#"{"other":[]}"#).unwrap();
        let doc = store.load().await.unwrap();
        assert!(doc.contains_key("customers"));
        assert!(!doc.contains_key("other"));
    }

    #[tokio::test]
    async fn commit_rewrites_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, r#"{"customers":[],"products":[{"id":1}]}"#);
        let store = FileDocumentStore::new(StoreConfig::new(&path));

        assert!(store.commit("customers", r#"[{"id":1,"name":"Alice"}]"#.into()).await);

        let on_disk = parse_document(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let customers: serde_json::Value = serde_json::from_str(&on_disk["customers"]).unwrap();
        let products: serde_json::Value = serde_json::from_str(&on_disk["products"]).unwrap();
        assert_eq!(customers, serde_json::json!([{ "id": 1, "name": "Alice" }]));
        assert_eq!(products, serde_json::json!([{ "id": 1 }]));

        let cached = store.load().await.unwrap();
        assert_eq!(cached["customers"], r#"[{"id":1,"name":"Alice"}]"#);
    }

    #[tokio::test]
    async fn commit_shrinking_document_truncates_file() {
        let dir = tempfile::tempdir().unwrap();
        let long = format!(r#"{{"notes":["{}"]}}"#, "x".repeat(4096));
        let path = write_doc(&dir, &long);
        let store = FileDocumentStore::new(StoreConfig::new(&path).with_pretty(false));

        assert!(store.commit("notes", "[]".into()).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"notes":[]}"#);
    }

    #[tokio::test]
    async fn commit_with_sync_every_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "{}");
        let config = StoreConfig::new(&path).with_sync_mode(SyncMode::EveryWrite);
        let store = FileDocumentStore::new(config);

        assert!(store.commit("customers", "[]".into()).await);
        let on_disk = parse_document(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.contains_key("customers"));
    }

    #[tokio::test]
    async fn invalid_table_text_fails_commit_without_touching_document() {
        let dir = tempfile::tempdir().unwrap();
        let original = r#"{"customers":[]}"#;
        let path = write_doc(&dir, original);
        let store = FileDocumentStore::new(StoreConfig::new(&path));

        assert!(!store.commit("customers", "[{".into()).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert_eq!(store.load().await.unwrap()["customers"], "[]");
    }

    #[tokio::test]
    async fn corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "{ this is not json");
        let store = FileDocumentStore::new(StoreConfig::new(&path));

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
        assert!(!store.commit("customers", "[]".into()).await);
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(StoreConfig::new(dir.path().join("absent.json")));
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn second_holder_is_refused_until_first_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "{}");

        let first = FileDocumentStore::open(StoreConfig::new(&path)).unwrap();
        assert!(first.is_open());

        let err = FileDocumentStore::open(StoreConfig::new(&path)).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));

        drop(first);
        let second = FileDocumentStore::open(StoreConfig::new(&path)).unwrap();
        assert!(second.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lazy_store_opens_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "{}");
        let store = FileDocumentStore::new(StoreConfig::new(&path));
        assert!(!store.is_open());

        store.load().await.unwrap();
        assert!(store.is_open());
    }

    #[tokio::test]
    async fn inserted_table_is_written_by_next_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, r#"{"products":[]}"#);
        let store = FileDocumentStore::new(StoreConfig::new(&path));

        store.insert_table("customers", "[]".into()).await.unwrap();
        assert!(store.load().await.unwrap().contains_key("customers"));

        let err = store.insert_table("customers", "[]".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::TableExists(_)));

        assert!(store.commit("products", r#"[{"id":1}]"#.into()).await);
        let on_disk = parse_document(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["customers"], "[]");
    }

    #[test]
    fn debug_format() {
        let store = FileDocumentStore::new(StoreConfig::new("db.json"));
        let debug = format!("{store:?}");
        assert!(debug.contains("FileDocumentStore"));
        assert!(debug.contains("db.json"));
    }
}
