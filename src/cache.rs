//! Build cache for incremental image materialization.
//!
//! Copying preview images is the only per-model I/O that scales with the size
//! of the library, and on a large, slowly changing tree almost every model is
//! unchanged between builds. This module lets the materializer skip models
//! whose catalog data hasn't changed since they were last processed.
//!
//! # Design
//!
//! The cache is keyed by model id and stores a digest of the model's
//! **mergeable fields**: name, notes, tags, collections, attributes, source
//! path, release and subscription. `image` and `dateAdded` are deliberately
//! excluded: the pipeline itself writes them, and hashing them would make
//! every build invalidate the next one.
//!
//! The cache only decides whether image work may be skipped. Catalog data is
//! always rebuilt from the configs on disk, so a stale or deleted cache costs
//! time, never correctness.
//!
//! ## Storage
//!
//! JSON sidecar next to the catalog (`data/build-cache.json` by default):
//!
//! ```json
//! {
//!   "version": 2,
//!   "models": {
//!     "goblin-3fa9c01e2b7d": {
//!       "hash": "9c1e…",
//!       "lastProcessed": "2024-11-02T10:00:00Z",
//!       "imagePath": "/images/models/model-goblin-3fa9c01e2b7d-cover.png"
//!     }
//!   },
//!   "lastBuild": "2024-11-02T10:00:00Z"
//! }
//! ```
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `build` to start from an empty cache. Every model is
//! then treated as changed.

use crate::types::{Attribute, ModelEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;

/// Version of the cache file format. Bump this to invalidate all existing
/// caches when the format or the digest computation changes.
const CACHE_VERSION: u32 = 2;

/// What the cache remembers about one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub hash: String,
    pub last_processed: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// On-disk cache mapping model ids to their last processed digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCache {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub models: BTreeMap<String, CacheRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_build: Option<DateTime<Utc>>,
}

impl BuildCache {
    /// Create an empty cache (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            models: BTreeMap::new(),
            last_build: None,
        }
    }

    /// Load from `path`. Returns an empty cache if the file doesn't exist or
    /// can't be parsed (version mismatch, corruption).
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let cache: Self = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        if cache.version != CACHE_VERSION {
            return Self::empty();
        }
        cache
    }

    /// Save to `path`, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn get(&self, id: &str) -> Option<&CacheRecord> {
        self.models.get(id)
    }

    /// Whether `id` was last processed with exactly this digest.
    pub fn is_fresh(&self, id: &str, hash: &str) -> bool {
        self.models.get(id).is_some_and(|r| r.hash == hash)
    }

    /// Record that `id` was processed at `now`.
    pub fn record(
        &mut self,
        id: impl Into<String>,
        hash: impl Into<String>,
        now: DateTime<Utc>,
        image_path: Option<String>,
    ) {
        self.models.insert(
            id.into(),
            CacheRecord {
                hash: hash.into(),
                last_processed: now,
                image_path,
            },
        );
    }

    /// Drop records for models that are no longer in the catalog.
    pub fn retain_ids<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let keep: HashSet<&str> = ids.into_iter().collect();
        self.models.retain(|id, _| keep.contains(id.as_str()));
    }
}

/// SHA-256 digest of a model's mergeable fields, as a hex string.
///
/// Every field is length-prefixed so that values cannot bleed into each other
/// (`["ab"]` and `["a", "b"]` hash differently).
pub fn hash_model(model: &ModelEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"model\0");
    update_str(&mut hasher, &model.name);
    update_str(&mut hasher, &model.notes);
    update_list(&mut hasher, &model.tags);
    update_list(&mut hasher, &model.collections);
    update_attributes(&mut hasher, &model.attributes);
    update_str(&mut hasher, &model.source_path);
    update_opt(&mut hasher, model.release.as_deref());
    update_opt(&mut hasher, model.subscription.as_deref());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn update_list(hasher: &mut Sha256, values: &[String]) {
    hasher.update((values.len() as u64).to_le_bytes());
    for value in values {
        update_str(hasher, value);
    }
}

fn update_attributes(hasher: &mut Sha256, attributes: &[Attribute]) {
    hasher.update((attributes.len() as u64).to_le_bytes());
    for attr in attributes {
        update_str(hasher, &attr.key);
        // Canonical JSON text, so `32` and `"32"` differ.
        update_str(hasher, &attr.value.to_string());
    }
}

fn update_opt(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            update_str(hasher, v);
        }
        None => {
            hasher.update(b"\x00");
        }
    }
}
