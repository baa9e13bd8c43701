use std::future::Future;
use std::panic;
use std::sync::Arc;

use async_trait::async_trait;
use docstore_store::{DocumentStore, StoreError, EMPTY_TABLE};
use docstore_types::{Entity, EntityId, TableName};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{next_id, position_of, sorted_by_id, TableCache};
use crate::error::{RepoError, RepoResult};
use crate::traits::Repository;

fn check_cancelled(cancel: &CancellationToken) -> RepoResult<()> {
    if cancel.is_cancelled() {
        return Err(RepoError::Cancelled);
    }
    Ok(())
}

/// State shared by a repository and the mutation tasks it spawns.
struct TableState<T: Entity> {
    store: Arc<dyn DocumentStore>,
    table: TableName,
    cache: Mutex<TableCache<T>>,
}

impl<T: Entity> TableState<T> {
    /// The cache guard, loading the table first if needed.
    ///
    /// A loaded cache is served under the cache lock alone; the first load
    /// is taken under the write scope so concurrent first accesses read the
    /// table once.
    async fn loaded(&self, cancel: &CancellationToken) -> RepoResult<MutexGuard<'_, TableCache<T>>> {
        {
            let cache = self.cache.lock().await;
            if cache.is_loaded() {
                return Ok(cache);
            }
        }

        let _scope = self.store.write_scope().enter().await;
        let mut cache = self.cache.lock().await;
        self.load_into(&mut cache, cancel).await?;
        Ok(cache)
    }

    /// The cached list, reading the table into `cache` if it is unloaded.
    ///
    /// Callers must hold the write scope.
    async fn load_into<'c>(
        &self,
        cache: &'c mut TableCache<T>,
        cancel: &CancellationToken,
    ) -> RepoResult<&'c mut Vec<T>> {
        let entities = match cache.take() {
            Some(entities) => entities,
            None => {
                check_cancelled(cancel)?;
                self.read_table().await?
            }
        };
        Ok(cache.insert(entities))
    }

    /// Read and deserialize the table, creating it if the document lacks it.
    async fn read_table(&self) -> RepoResult<Vec<T>> {
        let table = self.table.as_str();
        let Some(text) = self.store.table(table).await? else {
            self.store
                .insert_table(table, EMPTY_TABLE.to_string())
                .await
                .map_err(|e| match e {
                    StoreError::TableExists(_) => RepoError::Schema {
                        table: table.to_string(),
                        reason: e.to_string(),
                    },
                    other => RepoError::Store(other),
                })?;
            info!(table, "created missing table");
            return Ok(Vec::new());
        };

        let entities: Vec<T> =
            serde_json::from_str(&text).map_err(|e| RepoError::CorruptTable {
                table: table.to_string(),
                reason: e.to_string(),
            })?;
        debug!(table, count = entities.len(), "table loaded");
        Ok(entities)
    }

    /// Serialize `candidate` and commit it as the whole table.
    async fn commit(&self, candidate: &[T], cancel: &CancellationToken) -> RepoResult<bool> {
        check_cancelled(cancel)?;
        let table = self.table.as_str();
        let serialized = match serde_json::to_string(candidate) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(table, error = %e, "cannot serialize table");
                return Ok(false);
            }
        };
        Ok(self.store.commit(table, serialized).await)
    }

    /// Append `entity` under the next id. Returns the id once committed.
    async fn add_record(&self, mut entity: T, cancel: &CancellationToken) -> RepoResult<Option<EntityId>> {
        let _scope = self.store.write_scope().enter().await;
        let mut cache = self.cache.lock().await;
        let entities = self.load_into(&mut cache, cancel).await?;

        let id = next_id(entities);
        entity.set_id(id);

        let mut candidate = entities.clone();
        candidate.push(entity);
        if !self.commit(&candidate, cancel).await? {
            return Ok(None);
        }

        *entities = candidate;
        debug!(table = %self.table, id, "record added");
        Ok(Some(id))
    }

    async fn update_record(&self, entity: T, cancel: &CancellationToken) -> RepoResult<bool> {
        let _scope = self.store.write_scope().enter().await;
        let mut cache = self.cache.lock().await;
        let entities = self.load_into(&mut cache, cancel).await?;

        let id = entity.id();
        let Some(index) = position_of(entities, id) else {
            return Ok(false);
        };

        let mut candidate = entities.clone();
        candidate[index] = entity;
        if !self.commit(&candidate, cancel).await? {
            return Ok(false);
        }

        *entities = candidate;
        debug!(table = %self.table, id, "record updated");
        Ok(true)
    }

    async fn remove_record(&self, id: EntityId, cancel: &CancellationToken) -> RepoResult<bool> {
        let _scope = self.store.write_scope().enter().await;
        let mut cache = self.cache.lock().await;
        let entities = self.load_into(&mut cache, cancel).await?;

        let Some(index) = position_of(entities, id) else {
            return Ok(false);
        };

        let mut candidate = entities.clone();
        candidate.remove(index);
        if !self.commit(&candidate, cancel).await? {
            return Ok(false);
        }

        *entities = candidate;
        debug!(table = %self.table, id, "record removed");
        Ok(true)
    }
}

/// Repository for the table holding records of type `T`.
///
/// Mutations hold the store's write scope from the moment they read the
/// cache until the commit result has been applied, so mutations across all
/// repositories sharing a store are linearizable. Lock order is always
/// write scope, then table cache.
///
/// Each mutation runs on its own tokio task. Dropping the caller's future
/// stops the wait, not the mutation: a commit that started is applied to
/// the cache before the write scope is released.
pub struct TableRepository<T: Entity> {
    state: Arc<TableState<T>>,
}

impl<T: Entity> TableRepository<T> {
    /// Repository for `T`'s default table.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_table(store, T::table_name())
    }

    /// Repository for `T` stored under an explicit table name.
    pub fn with_table(store: Arc<dyn DocumentStore>, table: TableName) -> Self {
        Self {
            state: Arc::new(TableState {
                store,
                table,
                cache: Mutex::new(TableCache::Unloaded),
            }),
        }
    }

    pub fn table(&self) -> &TableName {
        &self.state.table
    }

    /// Whether the table has been read into the cache yet.
    pub async fn is_loaded(&self) -> bool {
        self.state.cache.lock().await.is_loaded()
    }

    /// Run a mutation on its own task and wait for its result.
    async fn detached<R, F, Fut>(&self, mutation: F) -> RepoResult<R>
    where
        F: FnOnce(Arc<TableState<T>>) -> Fut + Send,
        Fut: Future<Output = RepoResult<R>> + Send + 'static,
        R: Send + 'static,
    {
        match task::spawn(mutation(Arc::clone(&self.state))).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(_) => Err(RepoError::Cancelled),
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for TableRepository<T> {
    async fn get_all(&self, cancel: &CancellationToken) -> RepoResult<Vec<T>> {
        check_cancelled(cancel)?;
        let cache = self.state.loaded(cancel).await?;
        Ok(sorted_by_id(cache.entities().unwrap_or_default()))
    }

    async fn get_by_id(&self, id: EntityId, cancel: &CancellationToken) -> RepoResult<Option<T>> {
        check_cancelled(cancel)?;
        let cache = self.state.loaded(cancel).await?;
        let matches: Vec<&T> = cache
            .entities()
            .unwrap_or_default()
            .iter()
            .filter(|e| e.id() == id)
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [entity] => Ok(Some((*entity).clone())),
            many => {
                warn!(table = %self.state.table, id, count = many.len(), "duplicate ids in table");
                Err(RepoError::MultipleMatches {
                    table: self.state.table.to_string(),
                    id,
                    count: many.len(),
                })
            }
        }
    }

    async fn add(&self, entity: &mut T, cancel: &CancellationToken) -> RepoResult<bool> {
        check_cancelled(cancel)?;
        let record = entity.clone();
        let cancel = cancel.clone();
        let assigned = self
            .detached(move |state| async move { state.add_record(record, &cancel).await })
            .await?;

        match assigned {
            Some(id) => {
                entity.set_id(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update(&self, entity: T, cancel: &CancellationToken) -> RepoResult<bool> {
        check_cancelled(cancel)?;
        let cancel = cancel.clone();
        self.detached(move |state| async move { state.update_record(entity, &cancel).await })
            .await
    }

    async fn remove(&self, id: EntityId, cancel: &CancellationToken) -> RepoResult<bool> {
        check_cancelled(cancel)?;
        let cancel = cancel.clone();
        self.detached(move |state| async move { state.remove_record(id, &cancel).await })
            .await
    }
}

impl<T: Entity> std::fmt::Debug for TableRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRepository")
            .field("table", &self.state.table)
            .finish_non_exhaustive()
    }
}
