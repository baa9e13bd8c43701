//! Single-file JSON document store.
//!
//! One document holds every table. Its top level is a JSON object mapping a
//! table name to that table's records (a JSON array). The store treats each
//! table value as opaque text: it never interprets records, it only replaces
//! whole tables and rewrites the whole document.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`FileDocumentStore`] -- the document lives in one exclusively-locked file
//! - [`InMemoryDocumentStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. The document is loaded once per store instance and cached.
//! 2. A commit replaces one table and rewrites the entire document.
//! 3. Commit failures are reported as `false`, never as errors.
//! 4. Load failures propagate as [`StoreError::Unavailable`].
//! 5. Mutating callers hold the store's [`WriteScope`] for their whole
//!    read-modify-write sequence.

pub mod config;
pub mod document;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{StoreConfig, SyncMode};
pub use document::{parse_document, render_document, Document, EMPTY_TABLE};
pub use error::{StoreError, StoreResult};
pub use file::FileDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use traits::{DocumentStore, WriteGuard, WriteScope};
