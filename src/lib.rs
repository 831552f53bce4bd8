//! # Model Gal
//!
//! A catalog builder for a static 3D model gallery. Your filesystem is the
//! data source: every directory holding a `config.orynt3d` document is either
//! a model or a release, releases hand their attributes and tags down to every
//! model nested below them, and the result is one JSON catalog plus a flat
//! directory of published preview images that a client-side page can browse.
//!
//! # Architecture: Two-Pass Pipeline
//!
//! ```text
//! 1. Crawl        models/          →  config paths      (sorted walk)
//! 2. Classify     each config      →  release | model | ignored
//! 3. Index        releases         →  ReleaseIndex      (all of them, first)
//! 4. Build        models           →  ModelEntry        (inheritance, identity)
//! 5. Write        catalog          →  data/models.json
//! 6. Materialize  changed models   →  images/models/    (cache-driven)
//! 7. Re-write     catalog + cache
//! ```
//!
//! Each build reads the previous catalog once, to carry `dateAdded` and the
//! published `image` forward, and the build cache once, to skip image work
//! for models whose mergeable fields haven't changed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Sorted directory walk collecting config files and crawl counters |
//! | [`document`] | Config document schema and release/model classification |
//! | [`release`] | Release records and the governed-directory index |
//! | [`model`] | Model building: naming, stable ids, inheritance, carry-forward |
//! | [`preview`] | Prioritized preview image search in a model directory |
//! | [`catalog`] | The persisted catalog and its scan statistics |
//! | [`cache`] | Mergeable-field digests and the persisted build cache |
//! | [`materialize`] | Publishing preview images, placeholder fallback |
//! | [`pipeline`] | Orchestration, build events, run statistics |
//! | [`config`] | `model-gal.toml` loading, validation, resolved build settings |
//! | [`types`] | `ModelEntry` and `Attribute`, the catalog's wire types |
//! | [`naming`] | Name resolution, relative paths, slugs |
//! | [`output`] | CLI output formatting for events, scans, and summaries |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Identity
//!
//! A model's id is a slug of its name plus a truncated SHA-256 of name and
//! relative path. Adding, removing, or reordering other models never changes
//! it, so `dateAdded` and published images survive any rebuild. Moving or
//! renaming a model is a new model.
//!
//! ## Nearest Release Wins
//!
//! Every release whose governed directory contains a model applies to it.
//! They are merged deepest first and the first value for a key wins, so the
//! model's own values beat any release and an inner release beats an outer
//! one. Containment compares path components, so `A/foo-bar` is never
//! governed by `A/foo`.
//!
//! ## Cache Is Only an Optimization
//!
//! Deleting the build cache forces a full image pass and nothing else. A
//! corrupt or outdated cache loads as empty; it never fails a build.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod document;
pub mod materialize;
pub mod model;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod release;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
