//! Typed repositories over the shared docstore document.
//!
//! A [`TableRepository<T>`] turns one table of the document into an ordered,
//! id-addressable collection of `T`. The table is read and deserialized on
//! the first operation and cached for the life of the repository. Mutations
//! build a candidate table, commit it through the
//! [`DocumentStore`](docstore_store::DocumentStore), and touch the cache only
//! when the commit succeeded.
//!
//! # Outcomes
//!
//! - Load failures propagate as [`RepoError`].
//! - Commit failures come back as `Ok(false)`.
//! - Absent records are `Ok(None)` / `Ok(false)`.
//! - Duplicate ids found by a lookup are [`RepoError::MultipleMatches`].

pub mod cache;
pub mod error;
pub mod table;
pub mod traits;

pub use cache::TableCache;
pub use error::{RepoError, RepoResult};
pub use table::TableRepository;
pub use traits::Repository;

pub use tokio_util::sync::CancellationToken;
