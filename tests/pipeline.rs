//! End-to-end pipeline tests against a real model library in a temp directory.

use model_gal::catalog::{Catalog, CatalogError, ScanStats};
use model_gal::config::{BuildConfig, BuildSettings};
use model_gal::pipeline::{self, BuildError, BuildResult};
use model_gal::scan::ScanError;
use model_gal::types::{ModelEntry, attribute_value};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

// =========================================================================
// Fixtures
// =========================================================================

struct Library {
    _tmp: TempDir,
    settings: BuildSettings,
}

impl Library {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let settings =
            BuildConfig::default().settings(&tmp.path().join("models"), &tmp.path().join("public"));
        fs::create_dir_all(&settings.source_root).unwrap();
        Self {
            _tmp: tmp,
            settings,
        }
    }

    fn dir(&self, rel: &str) -> std::path::PathBuf {
        self.settings.source_root.join(rel)
    }

    fn config(&self, rel: &str, doc: serde_json::Value) {
        let dir = self.dir(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.orynt3d"), doc.to_string()).unwrap();
    }

    fn release(&self, rel: &str, attributes: &[(&str, &str)], tags: &[&str]) {
        let include: Vec<_> = attributes
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": v }))
            .collect();
        let doc = json!({
            "scanMeta": {
                "attributes": { "include": include },
                "tags": { "include": tags },
            }
        });
        self.config(rel, doc);
    }

    fn model(&self, rel: &str, name: &str) {
        self.config(rel, json!({ "modelMeta": { "name": name } }));
    }

    fn file(&self, rel: &str) {
        let path = self.dir(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("bytes of {rel}")).unwrap();
    }

    fn build(&self) -> BuildResult {
        pipeline::build(&self.settings, true, None).unwrap()
    }

    fn catalog_on_disk(&self) -> Catalog {
        Catalog::load(&self.settings.catalog_path).unwrap().unwrap()
    }
}

fn find<'a>(catalog: &'a Catalog, name: &str) -> &'a ModelEntry {
    catalog
        .models
        .iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("model '{name}' not in catalog"))
}

/// Catalog JSON with run-specific fields blanked.
fn stable_json(catalog: &Catalog) -> String {
    let mut catalog = catalog.clone();
    catalog.last_updated = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
    catalog.scan_stats = ScanStats::default();
    serde_json::to_string_pretty(&catalog).unwrap()
}

// =========================================================================
// End to end
// =========================================================================

#[test]
fn winter_release_goblin_example() {
    let lib = Library::new();
    lib.release("Collection1", &[("release", "Winter2024")], &[]);
    lib.config(
        "Collection1/Goblin",
        json!({ "modelMeta": { "name": "Goblin", "cover": "cover.png" } }),
    );
    lib.file("Collection1/Goblin/cover.png");

    let result = lib.build();
    let catalog = lib.catalog_on_disk();
    assert_eq!(catalog, result.catalog);
    assert_eq!(catalog.total_count, 1);

    let goblin = find(&catalog, "Goblin");
    assert_eq!(goblin.release.as_deref(), Some("Winter2024"));
    assert_eq!(goblin.directory_collection.as_deref(), Some("Collection1"));

    let expected = format!("/images/models/model-{}-cover.png", goblin.id);
    assert_eq!(goblin.image.as_deref(), Some(expected.as_str()));
    let published = lib.settings.images_dir.join(format!("model-{}-cover.png", goblin.id));
    assert_eq!(
        fs::read(&published).unwrap(),
        fs::read(lib.dir("Collection1/Goblin/cover.png")).unwrap()
    );
}

#[test]
fn catalog_json_shape() {
    let lib = Library::new();
    lib.model("Loose", "Loose");
    lib.build();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&lib.settings.catalog_path).unwrap()).unwrap();
    assert_eq!(raw["totalCount"], 1);
    assert!(raw["lastUpdated"].is_string());
    assert!(raw["scanStats"]["directoriesScanned"].is_number());

    let model = &raw["models"][0];
    for key in ["tags", "collections", "attributes"] {
        assert!(model[key].is_array(), "{key} should be an array");
    }
    for key in ["release", "subscription"] {
        assert!(model.get(key).is_none(), "{key} should be absent");
    }
    assert_eq!(model["image"], "/images/placeholder.png");
    assert!(model["dateAdded"].is_string());
}

// =========================================================================
// Idempotence and identity
// =========================================================================

#[test]
fn second_build_is_identical_and_copies_nothing() {
    let lib = Library::new();
    lib.release("Collection1", &[("release", "Winter2024")], &["fantasy"]);
    lib.model("Collection1/Goblin", "Goblin");
    lib.file("Collection1/Goblin/cover.png");
    lib.model("Collection1/Orc", "Orc");
    lib.file("Collection1/Orc/images/orc.jpg");
    lib.model("Loose", "Loose");

    let first = lib.build();
    let first_json = stable_json(&first.catalog);

    let second = lib.build();
    assert_eq!(stable_json(&second.catalog), first_json);
    assert_eq!(stable_json(&lib.catalog_on_disk()), first_json);
    assert_eq!(second.images.copied, 0);
    assert_eq!(second.images.reused, 0);
    assert_eq!(second.images.resolved, 0);
    // Only the placeholder model is retried.
    assert_eq!(second.images.placeholders, 1);
    assert_eq!(second.images.skipped, 2);
}

#[test]
fn ids_survive_unrelated_changes() {
    let lib = Library::new();
    lib.model("A/Goblin", "Goblin");
    lib.model("B/Orc", "Orc");
    let before = lib.build().catalog;
    let goblin = find(&before, "Goblin").clone();

    fs::remove_dir_all(lib.dir("B")).unwrap();
    lib.model("0-First/Troll", "Troll");
    lib.model("A/Goblin/Nested", "Nested");
    let after = lib.build().catalog;

    let again = find(&after, "Goblin");
    assert_eq!(again.id, goblin.id);
    assert_eq!(again.date_added, goblin.date_added);
    assert_eq!(after.total_count, 3);
}

#[test]
fn renamed_model_gets_new_identity() {
    let lib = Library::new();
    lib.model("A/Goblin", "Goblin");
    let before = find(&lib.build().catalog, "Goblin").id.clone();

    lib.model("A/Goblin", "Goblin King");
    let after = lib.build().catalog;
    assert_ne!(find(&after, "Goblin King").id, before);
}

#[test]
fn renamed_model_leaves_no_orphaned_image() {
    let lib = Library::new();
    lib.config(
        "A/Goblin",
        json!({ "modelMeta": { "name": "Goblin", "cover": "cover.png" } }),
    );
    lib.file("A/Goblin/cover.png");
    fs::create_dir_all(&lib.settings.images_dir).unwrap();
    fs::write(lib.settings.images_dir.join("banner.png"), "site asset").unwrap();
    let old_id = find(&lib.build().catalog, "Goblin").id.clone();
    let old_file = lib.settings.images_dir.join(format!("model-{old_id}-cover.png"));
    assert!(old_file.is_file());

    lib.config(
        "A/Goblin",
        json!({ "modelMeta": { "name": "Goblin King", "cover": "cover.png" } }),
    );
    let result = lib.build();
    let new_id = &find(&result.catalog, "Goblin King").id;

    assert_eq!(result.images.pruned, 1);
    assert!(!old_file.exists());
    assert!(lib.settings.images_dir.join(format!("model-{new_id}-cover.png")).is_file());
    assert!(lib.settings.images_dir.join("banner.png").is_file());
}

// =========================================================================
// Inheritance
// =========================================================================

#[test]
fn release_applies_to_nested_models_only() {
    let lib = Library::new();
    lib.release("A", &[("release", "R1")], &["fantasy"]);
    lib.model("A/B/model", "Nested");
    lib.model("C/model", "Sibling");
    lib.model("A-extra/model", "Lookalike");

    let catalog = lib.build().catalog;

    let nested = find(&catalog, "Nested");
    assert_eq!(nested.release.as_deref(), Some("R1"));
    assert_eq!(attribute_value(&nested.attributes, "release"), Some("R1"));
    assert_eq!(nested.tags, vec!["fantasy"]);

    for name in ["Sibling", "Lookalike"] {
        let model = find(&catalog, name);
        assert_eq!(model.release, None, "{name}");
        assert!(model.attributes.is_empty(), "{name}");
        assert!(model.tags.is_empty(), "{name}");
    }
}

#[test]
fn own_attribute_beats_release() {
    let lib = Library::new();
    lib.release("A", &[("release", "R1"), ("scale", "32mm")], &[]);
    lib.config(
        "A/Goblin",
        json!({ "modelMeta": {
            "name": "Goblin",
            "attributes": [{ "key": "release", "value": "Special" }]
        } }),
    );

    let catalog = lib.build().catalog;
    let goblin = find(&catalog, "Goblin");
    assert_eq!(attribute_value(&goblin.attributes, "release"), Some("Special"));
    assert_eq!(attribute_value(&goblin.attributes, "scale"), Some("32mm"));
    assert_eq!(goblin.release.as_deref(), Some("Special"));
}

#[test]
fn deepest_release_wins() {
    let lib = Library::new();
    lib.release("A", &[("release", "Outer"), ("artist", "Ada")], &[]);
    lib.release("A/B", &[("release", "Inner")], &[]);
    lib.model("A/B/Goblin", "Goblin");

    let catalog = lib.build().catalog;
    let goblin = find(&catalog, "Goblin");
    assert_eq!(goblin.release.as_deref(), Some("Inner"));
    assert_eq!(attribute_value(&goblin.attributes, "artist"), Some("Ada"));
}

#[test]
fn release_wins_classification_over_model_fields() {
    let lib = Library::new();
    lib.config(
        "A",
        json!({
            "scanMeta": { "attributes": { "include": [{ "key": "release", "value": "R1" }] } },
            "modelMeta": { "name": "Not A Model" }
        }),
    );
    lib.model("A/Goblin", "Goblin");

    let result = lib.build();
    assert_eq!(result.catalog.total_count, 1);
    assert_eq!(find(&result.catalog, "Goblin").release.as_deref(), Some("R1"));
    assert_eq!(result.catalog.scan_stats.release_configs, 1);
}

// =========================================================================
// Images
// =========================================================================

#[test]
fn thumbnail_jpg_is_found_without_png_or_cover() {
    let lib = Library::new();
    lib.model("Goblin", "Goblin");
    lib.file("Goblin/thumbnail.jpg");

    let catalog = lib.build().catalog;
    assert!(
        find(&catalog, "Goblin")
            .image
            .as_deref()
            .unwrap()
            .ends_with("-thumbnail.jpg")
    );
}

#[test]
fn unchanged_model_image_is_left_alone() {
    let lib = Library::new();
    lib.model("Goblin", "Goblin");
    lib.file("Goblin/cover.png");
    let published = find(&lib.build().catalog, "Goblin").image.clone();

    // The source vanishing doesn't matter while the model is unchanged.
    fs::remove_file(lib.dir("Goblin/cover.png")).unwrap();
    let result = lib.build();
    assert_eq!(result.images.skipped, 1);
    assert_eq!(find(&result.catalog, "Goblin").image, published);
}

#[test]
fn placeholder_is_retried_until_an_image_appears() {
    let lib = Library::new();
    lib.model("Goblin", "Goblin");

    let first = lib.build();
    assert_eq!(
        find(&first.catalog, "Goblin").image.as_deref(),
        Some(lib.settings.placeholder.as_str())
    );

    lib.file("Goblin/fn_goblin.png");
    let second = lib.build();
    let image = find(&second.catalog, "Goblin").image.clone().unwrap();
    assert!(lib.settings.is_published(&image));
    assert!(image.ends_with("-fn_goblin.png"));
}

#[test]
fn deleted_cache_only_costs_a_reprocess() {
    let lib = Library::new();
    lib.model("Goblin", "Goblin");
    lib.file("Goblin/cover.png");
    let first = lib.build();

    fs::remove_file(&lib.settings.cache_path).unwrap();
    let second = lib.build();
    assert_eq!(second.images.skipped, 0);
    assert_eq!(second.images.kept, 1);
    assert_eq!(stable_json(&second.catalog), stable_json(&first.catalog));
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn missing_root_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let settings =
        BuildConfig::default().settings(&tmp.path().join("nope"), &tmp.path().join("out"));
    let err = pipeline::build(&settings, true, None).unwrap_err();
    assert!(matches!(err, BuildError::Scan(ScanError::RootNotFound(_))));
    assert!(!settings.catalog_path.exists());
}

#[test]
fn output_dir_that_cannot_be_created_is_fatal() {
    let lib = Library::new();
    lib.model("Goblin", "Goblin");
    let output_root = lib.settings.source_root.with_file_name("public");
    fs::write(&output_root, "not a directory").unwrap();

    let err = pipeline::build(&lib.settings, true, None).unwrap_err();
    assert!(matches!(err, BuildError::Catalog(CatalogError::Io(_))));
    assert!(output_root.is_file());
}

#[test]
fn numeric_attribute_values_survive_the_build() {
    let lib = Library::new();
    lib.config(
        "Goblin",
        json!({
            "modelMeta": {
                "name": "Goblin",
                "cover": "cover.png",
                "attributes": [{ "key": "scale", "value": 32 }],
            }
        }),
    );
    lib.file("Goblin/cover.png");

    let result = lib.build();
    assert_eq!(result.catalog.total_count, 1);
    assert_eq!(result.catalog.scan_stats.parse_errors, 0);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&lib.settings.catalog_path).unwrap()).unwrap();
    assert_eq!(raw["models"][0]["attributes"], json!([{ "key": "scale", "value": 32 }]));

    // Unchanged on a second run, so the cache digest is stable for non-strings.
    let again = lib.build();
    assert_eq!(again.images.skipped, 1);
}

#[test]
fn bad_config_does_not_abort_the_run() {
    let lib = Library::new();
    let broken = lib.dir("Broken");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("config.orynt3d"), "{ \"modelMeta\": ").unwrap();
    lib.model("Goblin", "Goblin");
    lib.config("Empty", json!({}));

    let result = lib.build();
    assert_eq!(result.catalog.total_count, 1);
    assert_eq!(result.catalog.scan_stats.parse_errors, 1);
    assert_eq!(result.catalog.scan_stats.ignored_configs, 1);
    assert_eq!(result.run.successes, 1);
    assert_eq!(result.run.errors, 1);
}
