//! CLI output formatting for scans and builds.
//!
//! # Information-First Display
//!
//! Every model is shown by its semantic identity (position and name) first,
//! with provenance and resolved fields as indented context lines. Filesystem
//! paths are secondary, relative to the source root wherever possible.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Models
//! 001 Goblin
//!     Source: Collection1/Goblin
//!     Release: Winter2024
//!     Tags: fantasy, monster
//!     Image: /lib/Collection1/Goblin/cover.png
//!
//! Scanned 12 directories, 40 files, 3 configs (1 release, 2 models, 0 ignored)
//! ```
//!
//! ## Build events
//!
//! ```text
//! 001 Goblin: copied → /images/models/model-goblin-3fa9c01e2b7d-cover.png
//! warning: rejected models/Broken/config.orynt3d: expected value at line 1 column 3
//! ```
//!
//! ## Summary
//!
//! ```text
//! Catalog: 2 models → public/data/models.json
//! Images: 1 unchanged, 1 copied, 0 reused, 0 resolved, 0 kept, 0 placeholder (2 total)
//! Run: 2 succeeded, 1 error
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::catalog::{Catalog, ScanStats};
use crate::pipeline::{BuildEvent, BuildResult};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: u64, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Build events
// ============================================================================

/// Format one pipeline event. Progress and outcomes are plain lines; per-item
/// failures are prefixed with `warning:`.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::CrawlProgress { directories, files } => {
            vec![format!(
                "    crawled {} directories, {} files",
                directories, files
            )]
        }
        BuildEvent::CrawlError { path, message } => match path {
            Some(path) => vec![format!(
                "warning: cannot read {}: {}",
                path.display(),
                message
            )],
            None => vec![format!("warning: crawl error: {}", message)],
        },
        BuildEvent::ConfigRejected { path, message } => {
            vec![format!("warning: rejected {}: {}", path.display(), message)]
        }
        BuildEvent::DuplicateModel { id, path } => {
            vec![format!(
                "warning: duplicate model id {} from {} (skipped)",
                id,
                path.display()
            )]
        }
        BuildEvent::ModelProgress { done, total } => {
            vec![format!("    built {}/{} models", done, total)]
        }
        BuildEvent::PriorCatalogUnreadable { path, message } => {
            vec![format!(
                "warning: ignoring unreadable catalog {}: {}",
                path.display(),
                message
            )]
        }
        BuildEvent::ImageMaterialized {
            index,
            name,
            status,
            image,
        } => vec![format!(
            "{} {}: {} \u{2192} {}",
            format_index(*index),
            name,
            status.label(),
            image
        )],
        BuildEvent::ImageFailed {
            name,
            source,
            message,
        } => vec![
            format!("warning: cannot publish image for {}: {}", name, message),
            format!("    Source: {}", source),
        ],
        BuildEvent::ImagePruned { path } => {
            vec![format!("    pruned {}", path.display())]
        }
        BuildEvent::PruneFailed { path, message } => {
            vec![format!(
                "warning: cannot remove orphaned image {}: {}",
                path.display(),
                message
            )]
        }
    }
}

pub fn print_build_event(event: &BuildEvent) {
    for line in format_build_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Scan report
// ============================================================================

/// One-line scan statistics.
pub fn format_scan_stats(stats: &ScanStats) -> String {
    let mut line = format!(
        "Scanned {}, {}, {} ({} release, {}, {} ignored)",
        plural(stats.directories_scanned, "directory", "directories"),
        plural(stats.files_scanned, "file", "files"),
        plural(stats.config_files, "config", "configs"),
        stats.release_configs,
        plural(stats.model_configs, "model", "models"),
        stats.ignored_configs,
    );
    let problems = stats.parse_errors + stats.crawl_errors + stats.duplicate_models;
    if problems > 0 {
        line.push_str(&format!(
            "; {} unparseable, {} unreadable, {} duplicate",
            stats.parse_errors, stats.crawl_errors, stats.duplicate_models
        ));
    }
    line
}

/// Format a resolved catalog as a model inventory followed by scan statistics.
pub fn format_scan_report(catalog: &Catalog) -> Vec<String> {
    let mut lines = Vec::new();

    if !catalog.models.is_empty() {
        lines.push("Models".to_string());
    }
    for (i, model) in catalog.models.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), model.name));
        let source = if model.relative_source_path.is_empty() {
            "."
        } else {
            model.relative_source_path.as_str()
        };
        lines.push(format!("    Source: {}", source));
        if let Some(release) = &model.release {
            lines.push(format!("    Release: {}", release));
        }
        if let Some(subscription) = &model.subscription {
            lines.push(format!("    Subscription: {}", subscription));
        }
        if !model.tags.is_empty() {
            lines.push(format!("    Tags: {}", model.tags.join(", ")));
        }
        match &model.image {
            Some(image) => lines.push(format!("    Image: {}", image)),
            None => lines.push("    Image: (none)".to_string()),
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format_scan_stats(&catalog.scan_stats));
    lines
}

pub fn print_scan_report(catalog: &Catalog) {
    for line in format_scan_report(catalog) {
        println!("{}", line);
    }
}

// ============================================================================
// Build summary
// ============================================================================

/// Format the end-of-run summary.
pub fn format_build_summary(result: &BuildResult, catalog_path: &Path) -> Vec<String> {
    vec![
        format_scan_stats(&result.catalog.scan_stats),
        format!(
            "Catalog: {} \u{2192} {}",
            plural(result.catalog.total_count as u64, "model", "models"),
            catalog_path.display()
        ),
        format!("Images: {}", result.images),
        format!(
            "Run: {} succeeded, {}",
            result.run.successes,
            plural(result.run.errors, "error", "errors")
        ),
    ]
}

pub fn print_build_summary(result: &BuildResult, catalog_path: &Path) {
    for line in format_build_summary(result, catalog_path) {
        println!("{}", line);
    }
}
