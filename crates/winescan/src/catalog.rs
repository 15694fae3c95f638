//! The wine catalog.
//!
//! A catalog is a JSON object mapping item identifiers to item records. It is
//! loaded once at startup and never modified afterwards. Iteration follows the
//! order the keys appear in the document.

use std::collections::HashMap;
use std::path::Path;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// One wine in the catalog.
///
/// Every field is optional in the source document. Missing fields come back
/// as empty strings (or `None` for `url`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemRecord {
    /// Display name.
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    /// Growing region.
    #[serde(deserialize_with = "lenient_text")]
    pub region: String,
    /// Grape variety.
    #[serde(deserialize_with = "lenient_text")]
    pub variety: String,
    /// Vintage year, kept as text.
    #[serde(deserialize_with = "lenient_text")]
    pub vintage: String,
    /// Tasting notes.
    #[serde(deserialize_with = "lenient_text")]
    pub notes: String,
    /// Product page, if any.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_text"
    )]
    pub url: Option<String>,
}

/// Accept strings, numbers and booleans as text; `null` becomes empty.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected text, found {}",
            kind_of(&other)
        ))),
    }
}

/// Like [`lenient_text`], with empty text treated as absent.
fn lenient_optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient_text(deserializer)?;
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Immutable lookup table of known items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<(String, ItemRecord)>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON text.
    ///
    /// Entries that are not record-shaped are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or the top level is not an object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::catalog_format(format!(
                    "expected a JSON object at the top level, found {}",
                    kind_of(&other)
                )));
            }
        };

        let mut catalog = Self::new();
        for (id, entry) in map {
            if !entry.is_object() {
                warn!(id = %id, kind = kind_of(&entry), "Skipping non-object catalog entry");
                continue;
            }
            match serde_json::from_value::<ItemRecord>(entry) {
                Ok(record) => catalog.insert(id, record),
                Err(e) => warn!(id = %id, error = %e, "Skipping malformed catalog entry"),
            }
        }

        debug!("Parsed catalog with {} entries", catalog.len());
        Ok(catalog)
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&json)?;
        info!("Loaded {} catalog entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Load a catalog, falling back to an empty one on any failure.
    #[must_use]
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            warn!(
                path = %path.display(),
                error = %e,
                "Could not load catalog, using an empty one"
            );
            Self::new()
        })
    }

    /// Insert or replace the entry for `id`, keeping its original position.
    fn insert(&mut self, id: String, record: ItemRecord) {
        if let Some(&pos) = self.index.get(&id) {
            self.entries[pos].1 = record;
        } else {
            self.index.insert(id.clone(), self.entries.len());
            self.entries.push((id, record));
        }
    }

    /// Look up a record by its identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ItemRecord> {
        self.get_entry(id).map(|(_, record)| record)
    }

    /// Look up an entry by its identifier, returning the stored key too.
    #[must_use]
    pub fn get_entry(&self, id: &str) -> Option<(&str, &ItemRecord)> {
        self.index
            .get(id)
            .map(|&pos| (self.entries[pos].0.as_str(), &self.entries[pos].1))
    }

    /// Iterate entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemRecord)> {
        self.entries.iter().map(|(id, record)| (id.as_str(), record))
    }

    /// Find the first entry, in document order, whose name contains `needle`
    /// ignoring case. An empty needle matches nothing.
    #[must_use]
    pub fn find_by_name(&self, needle: &str) -> Option<(&str, &ItemRecord)> {
        let needle = needle.to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.iter()
            .find(|(_, record)| record.name.to_lowercase().contains(&needle))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ItemRecord)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, ItemRecord)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (id, record) in iter {
            catalog.insert(id, record);
        }
        catalog
    }
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, record) in &self.entries {
            map.serialize_entry(id, record)?;
        }
        map.end()
    }
}
