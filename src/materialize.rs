//! Image materialization: publishing preview images next to the catalog.
//!
//! After the catalog is built, each model's `image` is either a filesystem
//! path (found by [`preview::resolve`]), a path already under the publish
//! prefix (carried forward from the last build), an absolute URL, the shared
//! placeholder, or absent. Materialization turns every one of them into
//! something the browsing page can load.
//!
//! ## Change detection
//!
//! A model is processed only if [`needs_processing`] says so:
//!
//! - no cache record for its id, or the mergeable-field digest changed
//! - its image is neither publish-path-shaped nor an absolute URL
//! - its image is the placeholder (retried every build, since a real image
//!   may have appeared)
//!
//! Everything else is skipped and its `image` left untouched, so an unchanged
//! tree costs no image I/O at all.
//!
//! ## Outcomes
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `Kept` | URL, or published file still present |
//! | `Copied` | source copied to `model-<id>-<basename>` |
//! | `Reused` | target already held identical bytes, no copy |
//! | `Resolved` | source gone, fallback search found another image |
//! | `Placeholder` | nothing found |
//!
//! Target names are a pure function of id and source basename, so publishing
//! the same source twice always lands on the same file.
//!
//! ## Pruning
//!
//! A renamed or moved model gets a new id, which orphans its old
//! `model-<id>-*` file. [`prune_published`] removes every `model-*` file in
//! the publish directory that no catalog entry references. Other files there
//! are never touched.

use crate::cache::{BuildCache, hash_file, hash_model};
use crate::config::BuildSettings;
use crate::pipeline::{BuildEvent, emit};
use crate::preview;
use crate::types::ModelEntry;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// File name prefix of every published image.
const PUBLISHED_PREFIX: &str = "model-";

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Cannot create publish directory {0}: {1}")]
    PublishDir(PathBuf, #[source] io::Error),
}

/// What happened to one processed model's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Kept,
    Copied,
    Reused,
    Resolved,
    Placeholder,
}

impl ImageStatus {
    pub fn label(self) -> &'static str {
        match self {
            ImageStatus::Kept => "kept",
            ImageStatus::Copied => "copied",
            ImageStatus::Reused => "reused",
            ImageStatus::Resolved => "resolved",
            ImageStatus::Placeholder => "placeholder",
        }
    }
}

/// Summary of image work for a build run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageStats {
    pub skipped: u32,
    pub kept: u32,
    pub copied: u32,
    pub reused: u32,
    pub resolved: u32,
    pub placeholders: u32,
    pub failures: u32,
    /// Orphaned published files removed after the build.
    pub pruned: u32,
}

impl ImageStats {
    pub fn record(&mut self, status: ImageStatus) {
        match status {
            ImageStatus::Kept => self.kept += 1,
            ImageStatus::Copied => self.copied += 1,
            ImageStatus::Reused => self.reused += 1,
            ImageStatus::Resolved => self.resolved += 1,
            ImageStatus::Placeholder => self.placeholders += 1,
        }
    }

    pub fn processed(&self) -> u32 {
        self.kept + self.copied + self.reused + self.resolved + self.placeholders
    }

    pub fn total(&self) -> u32 {
        self.skipped + self.processed()
    }
}

impl fmt::Display for ImageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.processed() == 0 {
            write!(f, "{} unchanged, nothing to publish", self.skipped)?;
        } else {
            write!(
                f,
                "{} unchanged, {} copied, {} reused, ",
                self.skipped, self.copied, self.reused
            )?;
            write!(
                f,
                "{} resolved, {} kept, {} placeholder ({} total)",
                self.resolved,
                self.kept,
                self.placeholders,
                self.total()
            )?;
        }
        if self.pruned > 0 {
            write!(f, ", {} pruned", self.pruned)?;
        }
        if self.failures > 0 {
            write!(f, ", {} failed", self.failures)?;
        }
        Ok(())
    }
}

/// Whether a model's image must be (re)processed this run.
pub fn needs_processing(
    model: &ModelEntry,
    hash: &str,
    cache: &BuildCache,
    settings: &BuildSettings,
) -> bool {
    if !cache.is_fresh(&model.id, hash) {
        return true;
    }
    match model.image.as_deref() {
        None => true,
        Some(image) if settings.is_placeholder(image) => true,
        Some(image) => !(BuildSettings::is_url(image) || settings.is_published(image)),
    }
}

/// Deterministic file name of a published image.
pub fn published_name(id: &str, source: &Path) -> String {
    let basename = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{PUBLISHED_PREFIX}{id}-{basename}")
}

/// Publish images for every changed model, updating `models` and `cache`.
pub fn materialize(
    models: &mut [ModelEntry],
    covers: &HashMap<String, Option<String>>,
    cache: &mut BuildCache,
    settings: &BuildSettings,
    now: DateTime<Utc>,
    events: Option<&Sender<BuildEvent>>,
) -> Result<ImageStats, MaterializeError> {
    std::fs::create_dir_all(&settings.images_dir)
        .map_err(|e| MaterializeError::PublishDir(settings.images_dir.clone(), e))?;

    let mut stats = ImageStats::default();

    for (index, model) in models.iter_mut().enumerate() {
        let hash = hash_model(model);
        if !needs_processing(model, &hash, cache, settings) {
            stats.skipped += 1;
            continue;
        }

        let cover = covers.get(&model.id).and_then(|c| c.as_deref());
        let (image, status) = materialize_one(model, cover, settings, &mut stats, events);
        stats.record(status);

        emit(
            events,
            BuildEvent::ImageMaterialized {
                index: index + 1,
                name: model.name.clone(),
                status,
                image: image.clone(),
            },
        );
        cache.record(model.id.clone(), hash, now, Some(image.clone()));
        model.image = Some(image);
    }

    Ok(stats)
}

fn materialize_one(
    model: &ModelEntry,
    cover: Option<&str>,
    settings: &BuildSettings,
    stats: &mut ImageStats,
    events: Option<&Sender<BuildEvent>>,
) -> (String, ImageStatus) {
    if let Some(current) = model.image.as_deref()
        && !settings.is_placeholder(current)
    {
        if BuildSettings::is_url(current) {
            return (current.to_string(), ImageStatus::Kept);
        }
        match settings.published_file(current) {
            Some(file) if file.is_file() => {
                return (current.to_string(), ImageStatus::Kept);
            }
            Some(_) => {}
            None => {
                let source = Path::new(current);
                if source.is_file() {
                    match publish(&model.id, source, settings) {
                        Ok((path, true)) => return (path, ImageStatus::Copied),
                        Ok((path, false)) => return (path, ImageStatus::Reused),
                        Err(err) => report_failure(model, source, &err, stats, events),
                    }
                }
            }
        }
    }

    if let Some(found) = preview::resolve(Path::new(&model.source_path), cover) {
        match publish(&model.id, &found, settings) {
            Ok((path, _)) => return (path, ImageStatus::Resolved),
            Err(err) => report_failure(model, &found, &err, stats, events),
        }
    }

    (settings.placeholder.clone(), ImageStatus::Placeholder)
}

/// Copy `source` into the publish directory unless an identical copy exists.
///
/// Returns the public path and whether bytes were actually copied.
fn publish(id: &str, source: &Path, settings: &BuildSettings) -> io::Result<(String, bool)> {
    let name = published_name(id, source);
    let target = settings.images_dir.join(&name);

    let identical = target.is_file() && hash_file(&target)? == hash_file(source)?;
    if !identical {
        std::fs::copy(source, &target)?;
    }
    Ok((settings.publish_path(&name), !identical))
}

/// Remove published `model-*` files that no entry in `models` references.
///
/// A file that cannot be removed is reported, counted as a failure, and left
/// in place. Only listing the publish directory itself can fail the call.
pub fn prune_published(
    models: &[ModelEntry],
    settings: &BuildSettings,
    stats: &mut ImageStats,
    events: Option<&Sender<BuildEvent>>,
) -> io::Result<()> {
    let referenced: HashSet<PathBuf> = models
        .iter()
        .filter_map(|m| m.image.as_deref())
        .filter_map(|image| settings.published_file(image))
        .collect();

    for entry in std::fs::read_dir(&settings.images_dir)? {
        let path = entry?.path();
        let ours = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with(PUBLISHED_PREFIX));
        if !ours || !path.is_file() || referenced.contains(&path) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                stats.pruned += 1;
                emit(events, BuildEvent::ImagePruned { path });
            }
            Err(err) => {
                stats.failures += 1;
                emit(
                    events,
                    BuildEvent::PruneFailed {
                        path,
                        message: err.to_string(),
                    },
                );
            }
        }
    }
    Ok(())
}

fn report_failure(
    model: &ModelEntry,
    source: &Path,
    err: &io::Error,
    stats: &mut ImageStats,
    events: Option<&Sender<BuildEvent>>,
) {
    stats.failures += 1;
    emit(
        events,
        BuildEvent::ImageFailed {
            name: model.name.clone(),
            source: source.to_string_lossy().into_owned(),
            message: err.to_string(),
        },
    );
}
