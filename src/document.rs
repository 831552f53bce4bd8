//! Per-directory configuration documents and their classification.
//!
//! Each model library directory may hold one JSON document under the fixed
//! config filename (`config.orynt3d` by default). A document has two sections:
//!
//! ```json
//! {
//!   "scanMeta": {
//!     "attributes": { "include": [{ "key": "release", "value": "Winter2024" }] },
//!     "tags": { "include": ["fantasy"] }
//!   },
//!   "modelMeta": {
//!     "name": "Goblin",
//!     "notes": "",
//!     "tags": ["monster"],
//!     "collections": [],
//!     "attributes": [{ "key": "scale", "value": "32mm" }],
//!     "cover": "cover.png"
//!   }
//! }
//! ```
//!
//! Every field is optional and `null` reads as empty. Unknown fields are
//! ignored: the documents are written by other tools and carry far more than
//! the catalog needs.
//!
//! ## Classification
//!
//! [`classify`] turns a document into exactly one [`ConfigKind`]:
//!
//! 1. **Release** if `scanMeta.attributes.include` has a `release` or
//!    `subscription` key. Checked first, so it wins over a model name.
//! 2. **Model** if `modelMeta.name` is set (even to `""`) or `modelMeta.cover`
//!    is a non-empty string.
//! 3. **Ignored** otherwise. Not an error; the document is simply skipped.

use crate::types::Attribute;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use thiserror::Error;

/// Attribute keys that make a document a release.
pub const RELEASE_KEYS: &[&str] = &["release", "subscription"];

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw parsed config document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(deserialize_with = "null_as_default")]
    pub scan_meta: ScanMeta,
    #[serde(deserialize_with = "null_as_default")]
    pub model_meta: ModelMeta,
}

/// Inheritable section: attributes and tags pushed down the directory tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanMeta {
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: AttributeInclude,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: TagInclude,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttributeInclude {
    #[serde(deserialize_with = "null_as_default")]
    pub include: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TagInclude {
    #[serde(deserialize_with = "null_as_default")]
    pub include: Vec<String>,
}

/// Per-model section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelMeta {
    pub name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub collections: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: Vec<Attribute>,
    pub cover: Option<String>,
}

/// The inheritable part of a release document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseDecl {
    pub attributes: Vec<Attribute>,
    pub tags: Vec<String>,
}

/// What a config document describes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigKind {
    Release(ReleaseDecl),
    Model(ModelMeta),
    Ignored,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ConfigDocument {
    /// Read and parse a config document from disk.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content)?)
    }

    /// Parse a document, tolerating a leading byte-order mark.
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content.trim_start_matches('\u{feff}'))
    }

    pub fn is_release(&self) -> bool {
        self.scan_meta
            .attributes
            .include
            .iter()
            .any(|a| RELEASE_KEYS.contains(&a.key.as_str()))
    }

    pub fn is_model(&self) -> bool {
        self.model_meta.name.is_some()
            || self
                .model_meta
                .cover
                .as_deref()
                .is_some_and(|c| !c.is_empty())
    }
}

/// Classify a document. Release takes precedence over model.
pub fn classify(doc: ConfigDocument) -> ConfigKind {
    if doc.is_release() {
        ConfigKind::Release(ReleaseDecl {
            attributes: doc.scan_meta.attributes.include,
            tags: doc.scan_meta.tags.include,
        })
    } else if doc.is_model() {
        ConfigKind::Model(doc.model_meta)
    } else {
        ConfigKind::Ignored
    }
}
