use async_trait::async_trait;
use docstore_types::{Entity, EntityId};
use tokio_util::sync::CancellationToken;

use crate::error::RepoResult;

/// Typed access to one table.
///
/// This is the whole surface request-handling layers may use. Every
/// operation takes a cancellation token, checked before any load or commit;
/// a cancelled operation fails with `RepoError::Cancelled` and writes nothing.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Every record, ordered by ascending id.
    async fn get_all(&self, cancel: &CancellationToken) -> RepoResult<Vec<T>>;

    /// The record with `id`.
    ///
    /// Returns `Ok(None)` if no record has that id and
    /// `Err(RepoError::MultipleMatches)` if several do.
    async fn get_by_id(&self, id: EntityId, cancel: &CancellationToken) -> RepoResult<Option<T>>;

    /// Store `entity` under a fresh id.
    ///
    /// On success `entity` carries the assigned id. On a failed commit the
    /// caller's entity is left untouched and `Ok(false)` is returned.
    async fn add(&self, entity: &mut T, cancel: &CancellationToken) -> RepoResult<bool>;

    /// Replace the record whose id equals `entity.id()`.
    ///
    /// `Ok(false)` if no such record exists or the commit failed.
    async fn update(&self, entity: T, cancel: &CancellationToken) -> RepoResult<bool>;

    /// Delete the record with `id`.
    ///
    /// `Ok(false)` if no such record exists or the commit failed.
    async fn remove(&self, id: EntityId, cancel: &CancellationToken) -> RepoResult<bool>;
}
