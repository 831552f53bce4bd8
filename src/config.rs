//! Build configuration.
//!
//! Handles loading, validating, and merging `model-gal.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! config_filename = "config.orynt3d"   # Per-directory config document name
//! progress_interval = 250              # Report progress every N directories/models
//!
//! [output]
//! catalog = "data/models.json"         # Relative to the output root
//! cache = "data/build-cache.json"      # Relative to the output root
//! images_dir = "images/models"         # Relative to the output root
//! images_prefix = "/images/models"     # Public URL path of images_dir
//! placeholder = "/images/placeholder.png"
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Paths
//!
//! The scan root and the output root are not part of the file: they come from
//! the command line or the `MODELS_ROOT` / `MODEL_GAL_OUTPUT` environment
//! variables. [`BuildConfig::settings`] combines both into the fully resolved
//! [`BuildSettings`] the pipeline runs with.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `model-gal.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// File name of the per-directory config documents.
    pub config_filename: String,
    /// Emit a progress event every this many directories (crawl) or models.
    pub progress_interval: u64,
    /// Where build artifacts go.
    pub output: OutputConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            config_filename: "config.orynt3d".to_string(),
            progress_interval: 250,
            output: OutputConfig::default(),
        }
    }
}

/// Output locations, relative to the output root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Catalog JSON file.
    pub catalog: String,
    /// Build cache JSON file.
    pub cache: String,
    /// Directory that receives published preview images.
    pub images_dir: String,
    /// Public URL path under which `images_dir` is served.
    pub images_prefix: String,
    /// Public path of the shared placeholder image.
    pub placeholder: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            catalog: "data/models.json".to_string(),
            cache: "data/build-cache.json".to_string(),
            images_dir: "images/models".to_string(),
            images_prefix: "/images/models".to_string(),
            placeholder: "/images/placeholder.png".to_string(),
        }
    }
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.config_filename.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(ConfigError::Validation(
                "config_filename must be a plain file name".into(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::Validation(
                "progress_interval must be greater than 0".into(),
            ));
        }
        let prefix = &self.output.images_prefix;
        if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "output.images_prefix must be an absolute path below '/'".into(),
            ));
        }
        if self.output.placeholder.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.placeholder must not be empty".into(),
            ));
        }
        for (key, value) in [
            ("output.catalog", &self.output.catalog),
            ("output.cache", &self.output.cache),
            ("output.images_dir", &self.output.images_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    /// Resolve output locations against the scan root and output root.
    pub fn settings(&self, source_root: &Path, output_root: &Path) -> BuildSettings {
        let prefix = self.output.images_prefix.trim_end_matches('/');
        BuildSettings {
            source_root: source_root.to_path_buf(),
            catalog_path: output_root.join(&self.output.catalog),
            cache_path: output_root.join(&self.output.cache),
            images_dir: output_root.join(&self.output.images_dir),
            images_prefix: prefix.to_string(),
            placeholder: self.output.placeholder.clone(),
            config_filename: self.config_filename.trim().to_string(),
            progress_interval: self.progress_interval,
        }
    }
}

/// Fully resolved inputs of one build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    pub source_root: PathBuf,
    pub catalog_path: PathBuf,
    pub cache_path: PathBuf,
    pub images_dir: PathBuf,
    /// Public path of `images_dir`, without trailing slash.
    pub images_prefix: String,
    pub placeholder: String,
    pub config_filename: String,
    pub progress_interval: u64,
}

impl BuildSettings {
    /// Absolute `http(s)://` URL.
    pub fn is_url(image: &str) -> bool {
        image.starts_with("http://") || image.starts_with("https://")
    }

    /// Whether `image` is already a path under the publish prefix.
    pub fn is_published(&self, image: &str) -> bool {
        image
            .strip_prefix(self.images_prefix.trim_end_matches('/'))
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }

    pub fn is_placeholder(&self, image: &str) -> bool {
        image == self.placeholder
    }

    /// Public path for a file name inside the publish directory.
    pub fn publish_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.images_prefix.trim_end_matches('/'), file_name)
    }

    /// On-disk location of a published image path.
    pub fn published_file(&self, image: &str) -> Option<PathBuf> {
        if !self.is_published(image) {
            return None;
        }
        let rest = &image[self.images_prefix.trim_end_matches('/').len() + 1..];
        Some(self.images_dir.join(rest))
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// `BuildConfig::default()` as a TOML table: the layer `model-gal.toml` is
/// laid over.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Lay `overlay` over `base`.
///
/// Only `[output]` is a table in `model-gal.toml`, so setting one output key
/// keeps the stock value of its siblings. Any other value set in the overlay
/// wins outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `model-gal.toml` without interpreting it.
///
/// A missing file is `Ok(None)` and every setting keeps its stock value. A
/// file that is not TOML is an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Turn the stock layer plus the user's file (if any) into a checked
/// `BuildConfig`. Unknown keys fail here, then `validate` checks the values.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when absent.
pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `model-gal.toml` with all keys explained.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# model-gal configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# The model library root and the output root are given on the command line
# (--source / --output) or via MODELS_ROOT / MODEL_GAL_OUTPUT.

# File name of the per-directory config documents to look for.
config_filename = "config.orynt3d"

# Report progress every N directories while crawling and every N models
# while building.
progress_interval = 250

# ---------------------------------------------------------------------------
# Output locations (relative to the output root)
# ---------------------------------------------------------------------------
[output]
# The catalog consumed by the browsing page.
catalog = "data/models.json"

# Incremental build cache. Safe to delete: the next build reprocesses all
# models.
cache = "data/build-cache.json"

# Directory that receives published preview images.
images_dir = "images/models"

# Public URL path under which images_dir is served.
images_prefix = "/images/models"

# Public path of the image shown for models without a preview.
placeholder = "/images/placeholder.png"
"##
}
