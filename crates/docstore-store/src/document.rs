//! The in-memory form of the shared document and its JSON codec.

use std::collections::BTreeMap;

use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// Table name → that table's serialized records (raw JSON text).
///
/// Keys are unique and kept sorted, so rendering the same document twice
/// yields the same bytes.
pub type Document = BTreeMap<String, String>;

/// Serialized form of a table with no records.
pub const EMPTY_TABLE: &str = "[]";

/// Split document text into its tables without interpreting their contents.
///
/// The top level must be a JSON object. Each value is kept as the exact
/// source text of that table.
pub fn parse_document(text: &str) -> Result<Document, serde_json::Error> {
    let raw: BTreeMap<String, Box<RawValue>> = serde_json::from_str(text)?;
    Ok(raw
        .into_iter()
        .map(|(table, value)| (table, value.get().to_owned()))
        .collect())
}

/// Render a whole document, embedding each table as JSON (not as a string).
pub fn render_document(document: &Document, pretty: bool) -> Result<String, serde_json::Error> {
    let mut root = Map::new();
    for (table, text) in document {
        let value: Value = serde_json::from_str(text)?;
        root.insert(table.clone(), value);
    }

    let root = Value::Object(root);
    if pretty {
        serde_json::to_string_pretty(&root)
    } else {
        serde_json::to_string(&root)
    }
}
