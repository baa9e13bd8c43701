use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::table::TableName;

/// Surrogate identifier of a record within its table.
pub type EntityId = i64;

/// Identifier handed to the first record of an empty table.
pub const FIRST_ENTITY_ID: EntityId = 1;

/// A record that can live in a table of the shared document.
///
/// The identifier is owned by the repository: it is assigned when a record
/// is added and only supplied by callers to address an existing record for
/// update. Records are stored as JSON, so implementors normally derive
/// `Serialize`/`Deserialize` with `#[serde(rename_all = "camelCase")]` to keep
/// field names in the document's lowercase-initial form.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Current identifier.
    fn id(&self) -> EntityId;

    /// Overwrite the identifier.
    fn set_id(&mut self, id: EntityId);

    /// Table holding records of this type.
    ///
    /// Defaults to the pluralized, lower-cased type name.
    fn table_name() -> TableName
    where
        Self: Sized,
    {
        TableName::for_type::<Self>()
    }
}
