use std::fmt;

use crate::error::TypeError;

/// Name of a table inside the shared document.
///
/// Derived deterministically from a record type: the type's own name (module
/// path and generic arguments stripped), pluralized and lower-cased, so
/// `Customer` maps to `customers` and `Category` to `categories`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    /// Use an explicit table name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.trim().is_empty() || name.trim() != name {
            return Err(TypeError::InvalidTableName(name));
        }
        Ok(Self(name))
    }

    /// Derive the table name for `T`.
    pub fn for_type<T: ?Sized>() -> Self {
        Self::from_type_name(std::any::type_name::<T>())
    }

    /// Derive a table name from a (possibly path-qualified) type name.
    pub fn from_type_name(type_name: &str) -> Self {
        let base = type_name.split('<').next().unwrap_or(type_name);
        let short = base.rsplit("::").next().unwrap_or(base);
        Self(pluralize(short).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// English plural of a single noun, following the regular rules only.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let sibilant = ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix));
    if sibilant {
        return format!("{word}es");
    }

    if lower.len() > 1 && lower.ends_with('y') {
        let stem = &word[..word.len() - 1];
        if !stem
            .to_ascii_lowercase()
            .ends_with(['a', 'e', 'i', 'o', 'u'])
        {
            return format!("{stem}ies");
        }
    }

    format!("{word}s")
}
