use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::error::TypeError;

/// Longest accepted customer name, in characters.
pub const MAX_CUSTOMER_NAME_LEN: usize = 255;

/// A customer of the store, persisted in the `customers` table.
///
/// Fields are written camelCase. PascalCase keys (`Id`, `Name`) are accepted
/// on read; a record missing either field does not deserialize.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(alias = "Id")]
    pub id: EntityId,
    #[serde(alias = "Name")]
    pub name: String,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

impl Entity for Customer {
    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// Customer input as received from an operator, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    #[serde(default)]
    pub name: Option<String>,
}

impl CustomerDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Check the draft: the name must be present, not blank, and at most
    /// [`MAX_CUSTOMER_NAME_LEN`] characters.
    pub fn validate(&self) -> Result<(), TypeError> {
        let name = self.name.as_deref().ok_or(TypeError::Validation {
            field: "name",
            reason: "must be provided".into(),
        })?;

        if name.trim().is_empty() {
            return Err(TypeError::Validation {
                field: "name",
                reason: "must not be empty".into(),
            });
        }

        let len = name.chars().count();
        if len > MAX_CUSTOMER_NAME_LEN {
            return Err(TypeError::Validation {
                field: "name",
                reason: format!("must be at most {MAX_CUSTOMER_NAME_LEN} characters, got {len}"),
            });
        }

        Ok(())
    }

    /// Validate and convert into a customer carrying `id`.
    pub fn into_customer(self, id: EntityId) -> Result<Customer, TypeError> {
        self.validate()?;
        Ok(Customer {
            id,
            name: self.name.unwrap_or_default(),
        })
    }
}
