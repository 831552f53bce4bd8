//! Catalog build orchestration.
//!
//! Ties the stages together in the only order that is correct:
//!
//! ```text
//! prior catalog ──┐
//!                 ▼
//! crawl ─► classify ─► release index ─► build models ─► catalog (write)
//!          (phase 1, every config)      (phase 2)            │
//!                                                            ▼
//!                       cache ─► materialize images ─► catalog (re-write)
//!                                                            │
//!                                                            ▼
//!                                     prune orphaned images + cache
//! ```
//!
//! Phase 1 finishes before phase 2 starts: a release config may sit later in
//! traversal order than the models it governs (`A/B/config` sorts before
//! `A/config`), so no model is built until every release is indexed.
//!
//! The catalog is written once the models are resolved in memory and again
//! after image materialization. Published files that no entry references any
//! more (a renamed or moved model) are then removed. The cache is written
//! last; losing it only costs a full image pass on the next run.
//!
//! ## Events
//!
//! Nothing in the library prints. Stages report progress and per-item
//! failures as [`BuildEvent`]s over an optional channel; the CLI drains it on
//! a printer thread and formats with [`crate::output`].

use crate::cache::BuildCache;
use crate::catalog::{Catalog, CatalogError, ScanStats};
use crate::config::BuildSettings;
use crate::document::{ConfigDocument, ConfigKind, classify};
use crate::materialize::{
    ImageStats, ImageStatus, MaterializeError, materialize, prune_published,
};
use crate::model::{BuildContext, BuiltModel, build_model};
use crate::release::{ReleaseIndex, ReleaseRecord};
use crate::scan::{self, ScanError};
use crate::types::ModelEntry;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Progress and per-item outcomes reported while a build runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    CrawlProgress {
        directories: u64,
        files: u64,
    },
    CrawlError {
        path: Option<PathBuf>,
        message: String,
    },
    ConfigRejected {
        path: PathBuf,
        message: String,
    },
    DuplicateModel {
        id: String,
        path: PathBuf,
    },
    ModelProgress {
        done: usize,
        total: usize,
    },
    PriorCatalogUnreadable {
        path: PathBuf,
        message: String,
    },
    ImageMaterialized {
        /// 1-based position in the catalog.
        index: usize,
        name: String,
        status: ImageStatus,
        image: String,
    },
    ImageFailed {
        name: String,
        source: String,
        message: String,
    },
    /// A published file no catalog entry references was removed.
    ImagePruned {
        path: PathBuf,
    },
    PruneFailed {
        path: PathBuf,
        message: String,
    },
}

pub(crate) fn emit(events: Option<&Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        tx.send(event).ok();
    }
}

/// Models resolved from the source tree, before any image work.
#[derive(Debug, Default)]
pub struct Resolution {
    pub models: Vec<ModelEntry>,
    /// Configured cover per model id, needed again for image fallback.
    pub covers: HashMap<String, Option<String>>,
    pub stats: ScanStats,
}

impl Resolution {
    /// Add a built model unless its id is already taken.
    ///
    /// The first model in traversal order keeps the id.
    fn admit(&mut self, built: BuiltModel) -> Result<(), ModelEntry> {
        if self.covers.contains_key(&built.entry.id) {
            return Err(built.entry);
        }
        self.covers.insert(built.entry.id.clone(), built.cover);
        self.models.push(built.entry);
        Ok(())
    }
}

/// Per-item outcome counters for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub successes: u64,
    pub errors: u64,
}

impl RunStats {
    fn tally(scan: &ScanStats, images: &ImageStats) -> Self {
        Self {
            successes: scan.model_configs - scan.duplicate_models,
            errors: scan.parse_errors
                + scan.crawl_errors
                + scan.duplicate_models
                + u64::from(images.failures),
        }
    }
}

#[derive(Debug)]
pub struct BuildResult {
    pub catalog: Catalog,
    pub images: ImageStats,
    pub run: RunStats,
}

/// Crawl the source tree and resolve every model config into a catalog entry.
///
/// `prior` supplies carried-forward `dateAdded` and `image` values by id.
pub fn resolve_models(
    settings: &BuildSettings,
    prior: &HashMap<String, ModelEntry>,
    now: DateTime<Utc>,
    events: Option<&Sender<BuildEvent>>,
) -> Result<Resolution, ScanError> {
    let started = Instant::now();
    let crawl = scan::crawl(
        &settings.source_root,
        &settings.config_filename,
        settings.progress_interval,
        events,
    )?;

    let mut resolution = Resolution {
        stats: ScanStats {
            directories_scanned: crawl.stats.directories,
            files_scanned: crawl.stats.files,
            config_files: crawl.configs.len() as u64,
            crawl_errors: crawl.stats.errors,
            ..Default::default()
        },
        ..Default::default()
    };
    let stats = &mut resolution.stats;

    // Phase 1: classify every config and index all releases.
    let mut releases = ReleaseIndex::new();
    let mut pending = Vec::new();
    for path in crawl.configs {
        let doc = match ConfigDocument::load(&path) {
            Ok(doc) => doc,
            Err(err) => {
                stats.parse_errors += 1;
                emit(
                    events,
                    BuildEvent::ConfigRejected {
                        path,
                        message: err.to_string(),
                    },
                );
                continue;
            }
        };
        match classify(doc) {
            ConfigKind::Release(decl) => {
                stats.release_configs += 1;
                releases.insert(ReleaseRecord::new(&path, decl));
            }
            ConfigKind::Model(meta) => {
                stats.model_configs += 1;
                pending.push((path, meta));
            }
            ConfigKind::Ignored => stats.ignored_configs += 1,
        }
    }

    // Phase 2: build models against the complete index.
    let ctx = BuildContext {
        root: &settings.source_root,
        releases: &releases,
        prior,
        now,
    };
    let total = pending.len();
    for (i, (path, meta)) in pending.into_iter().enumerate() {
        let built = build_model(&ctx, &path, meta);
        if let Err(duplicate) = resolution.admit(built) {
            resolution.stats.duplicate_models += 1;
            emit(
                events,
                BuildEvent::DuplicateModel {
                    id: duplicate.id,
                    path,
                },
            );
        }

        let done = i + 1;
        if settings.progress_interval > 0 && done as u64 % settings.progress_interval == 0 {
            emit(events, BuildEvent::ModelProgress { done, total });
        }
    }

    resolution.stats.duration_ms = started.elapsed().as_millis() as u64;
    Ok(resolution)
}

/// Resolve the catalog in memory without writing anything.
pub fn dry_run(
    settings: &BuildSettings,
    events: Option<&Sender<BuildEvent>>,
) -> Result<Catalog, ScanError> {
    let now = Utc::now();
    let prior = load_prior(&settings.catalog_path, events);
    let resolution = resolve_models(settings, &prior, now, events)?;
    Ok(Catalog::new(resolution.models, now, resolution.stats))
}

/// Run the full build: resolve, write the catalog, publish images, re-write.
///
/// With `use_cache` false the existing build cache is ignored and every
/// model's image is reprocessed.
pub fn build(
    settings: &BuildSettings,
    use_cache: bool,
    events: Option<&Sender<BuildEvent>>,
) -> Result<BuildResult, BuildError> {
    let now = Utc::now();
    let prior = load_prior(&settings.catalog_path, events);
    let Resolution {
        models,
        covers,
        stats,
    } = resolve_models(settings, &prior, now, events)?;
    drop(prior);

    let mut catalog = Catalog::new(models, now, stats);
    catalog.save(&settings.catalog_path)?;

    let mut cache = if use_cache {
        BuildCache::load(&settings.cache_path)
    } else {
        BuildCache::empty()
    };

    let mut images = materialize(
        &mut catalog.models,
        &covers,
        &mut cache,
        settings,
        now,
        events,
    )?;
    catalog.save(&settings.catalog_path)?;

    prune_published(&catalog.models, settings, &mut images, events)?;
    cache.retain_ids(catalog.models.iter().map(|m| m.id.as_str()));
    cache.last_build = Some(now);
    cache.save(&settings.cache_path)?;

    let run = RunStats::tally(&catalog.scan_stats, &images);
    Ok(BuildResult {
        catalog,
        images,
        run,
    })
}

/// Previous catalog entries by id. A corrupt catalog counts as absent.
fn load_prior(path: &Path, events: Option<&Sender<BuildEvent>>) -> HashMap<String, ModelEntry> {
    match Catalog::load(path) {
        Ok(Some(catalog)) => catalog.into_prior(),
        Ok(None) => HashMap::new(),
        Err(err) => {
            emit(
                events,
                BuildEvent::PriorCatalogUnreadable {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                },
            );
            HashMap::new()
        }
    }
}
