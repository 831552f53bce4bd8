//! Shared test utilities for the model-gal test suite.
//!
//! Fixture builders that lay out a model library in a temp directory, plus
//! lookups that panic with a useful message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let settings = test_settings(tmp.path());
//! write_release(&settings.source_root.join("Collection1"), &[("release", "Winter2024")], &[]);
//! let goblin = settings.source_root.join("Collection1/Goblin");
//! write_model(&goblin, Some("Goblin"), Some("cover.png"));
//! write_image(&goblin.join("cover.png"));
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::path::Path;

use crate::config::{BuildConfig, BuildSettings};
use crate::types::ModelEntry;

pub const CONFIG_FILENAME: &str = "config.orynt3d";

// =========================================================================
// Settings and time
// =========================================================================

/// Stock settings with the source tree at `<root>/models` and output at
/// `<root>/public`. Nothing is created on disk.
pub fn test_settings(root: &Path) -> BuildSettings {
    BuildConfig::default().settings(&root.join("models"), &root.join("public"))
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 2, 10, 0, 0).unwrap()
}

// =========================================================================
// Library fixtures
// =========================================================================

/// Write raw content as the config document of `dir`.
pub fn write_config(dir: &Path, content: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(CONFIG_FILENAME), content).unwrap();
}

/// Write a release config governing `dir`.
pub fn write_release(dir: &Path, attributes: &[(&str, &str)], tags: &[&str]) {
    let include: Vec<_> = attributes
        .iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect();
    let doc = json!({
        "scanMeta": {
            "attributes": { "include": include },
            "tags": { "include": tags },
        }
    });
    write_config(dir, &doc.to_string());
}

/// Write a model config in `dir`. `None` fields are written as JSON `null`.
pub fn write_model(dir: &Path, name: Option<&str>, cover: Option<&str>) {
    let doc = json!({
        "modelMeta": {
            "name": name,
            "notes": "",
            "tags": [],
            "collections": [],
            "attributes": [],
            "cover": cover,
        }
    });
    write_config(dir, &doc.to_string());
}

/// Create a small file standing in for an image.
pub fn write_image(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let name = path.file_name().unwrap().to_string_lossy();
    std::fs::write(path, format!("image bytes of {name}")).unwrap();
}

/// A minimal entry for tests that don't go through the builder.
pub fn sample_entry(name: &str) -> ModelEntry {
    ModelEntry {
        id: crate::model::model_id(name, name),
        name: name.to_string(),
        notes: String::new(),
        tags: vec![],
        collections: vec![],
        attributes: vec![],
        release: None,
        subscription: None,
        directory_collection: Some(name.to_string()),
        source_path: format!("/lib/{name}"),
        relative_source_path: name.to_string(),
        image: None,
        date_added: fixed_now(),
    }
}

// =========================================================================
// Lookups
// =========================================================================

/// Find a model by name. Panics if not found.
pub fn find_model<'a>(models: &'a [ModelEntry], name: &str) -> &'a ModelEntry {
    models.iter().find(|m| m.name == name).unwrap_or_else(|| {
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        panic!("model '{name}' not found. Available: {names:?}")
    })
}
