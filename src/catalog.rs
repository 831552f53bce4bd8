//! The consolidated catalog file.
//!
//! The catalog is the single artifact the browsing page consumes:
//!
//! ```json
//! {
//!   "models": [ { "id": "goblin-3fa9c01e2b7d", "name": "Goblin", ... } ],
//!   "lastUpdated": "2024-11-02T10:00:00Z",
//!   "totalCount": 1,
//!   "scanStats": { "directoriesScanned": 3, ... }
//! }
//! ```
//!
//! It is replaced wholesale on every build. The previous catalog is read once
//! at the start of a run, only to carry `dateAdded` and `image` forward for
//! models whose id is unchanged.
//!
//! Writes go to a temporary sibling file that is then renamed over the
//! catalog, so a failed write never leaves a truncated catalog behind.

use crate::types::ModelEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Counters describing the scan that produced a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanStats {
    pub directories_scanned: u64,
    pub files_scanned: u64,
    pub config_files: u64,
    pub release_configs: u64,
    pub model_configs: u64,
    pub ignored_configs: u64,
    pub parse_errors: u64,
    pub crawl_errors: u64,
    pub duplicate_models: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub models: Vec<ModelEntry>,
    pub last_updated: DateTime<Utc>,
    pub total_count: usize,
    #[serde(default)]
    pub scan_stats: ScanStats,
}

impl Catalog {
    pub fn new(
        models: Vec<ModelEntry>,
        last_updated: DateTime<Utc>,
        scan_stats: ScanStats,
    ) -> Self {
        Self {
            total_count: models.len(),
            models,
            last_updated,
            scan_stats,
        }
    }

    /// Read a catalog. Returns `Ok(None)` if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Option<Self>, CatalogError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the catalog, replacing any previous one in a single rename.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = temp_path(path);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&ModelEntry> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Consume the catalog into an id → entry map for carrying fields forward.
    pub fn into_prior(self) -> HashMap<String, ModelEntry> {
        self.models.into_iter().map(|m| (m.id.clone(), m)).collect()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog.json".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
