//! Foundation types for docstore.
//!
//! Every other docstore crate depends on `docstore-types`. It defines what a
//! storable record looks like and how records map onto named tables inside
//! the shared document.
//!
//! # Key Types
//!
//! - [`Entity`]: Contract for records with a repository-assigned integer id
//! - [`EntityId`]: Surrogate identifier type
//! - [`TableName`]: Deterministic table name derived from a record type
//! - [`Customer`]: The customer record stored in the `customers` table
//! - [`CustomerDraft`]: Unvalidated customer input

pub mod customer;
pub mod entity;
pub mod error;
pub mod table;

pub use customer::{Customer, CustomerDraft, MAX_CUSTOMER_NAME_LEN};
pub use entity::{Entity, EntityId, FIRST_ENTITY_ID};
pub use error::TypeError;
pub use table::{pluralize, TableName};
