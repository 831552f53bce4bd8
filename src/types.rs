//! Shared types serialized into the catalog.
//!
//! These are the records the browsing page reads, so field names and the
//! absent-versus-empty rules are part of the public contract:
//! optional fields are omitted when not applicable (never `null`), and
//! `tags`, `collections` and `attributes` are always present as arrays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `{key, value}` pair attached to a model or declared by a release.
///
/// Values are kept as arbitrary JSON (strings, numbers, lists) and written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The value as display text: strings verbatim, `null` as absent, any
    /// other value as its JSON text.
    pub fn text(&self) -> Option<String> {
        match &self.value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// First attribute with `key`, if any.
pub fn find_attribute<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.key == key)
}

/// String value of the first attribute with `key`. `None` when the key is
/// absent or its value is not a string.
pub fn attribute_value<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a str> {
    find_attribute(attributes, key).and_then(|a| a.value.as_str())
}

/// One resolved catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    /// Stable identity: `<slug>-<digest>` of name and relative path.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    /// First path segment under the scan root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_collection: Option<String>,
    /// Absolute model directory at build time.
    pub source_path: String,
    /// Model directory relative to the scan root, `/`-separated.
    pub relative_source_path: String,
    /// Filesystem path before materialization; publish path or URL after.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub date_added: DateTime<Utc>,
}
