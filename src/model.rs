//! Model building: the second pass of config resolution.
//!
//! Turns one model config into a [`ModelEntry`], given the [`ReleaseIndex`]
//! collected in the first pass and the previous run's catalog.
//!
//! ## Identity
//!
//! `id = <slug(name)>-<first 12 hex chars of sha256(name \0 relative_path)>`
//!
//! The digest makes ids content-addressed: the same name at the same place in
//! the tree always gets the same id, no matter what else was added or removed.
//! The slug prefix keeps ids greppable. Collisions need identical 48-bit
//! digests and are guarded against by the pipeline anyway.
//!
//! ## Inheritance
//!
//! The model's own tags and attributes come first. Each governing release is
//! then folded in, nearest first: an attribute is appended only when its key
//! is still absent, a tag only when not yet present. `release` and
//! `subscription` are promoted to top-level fields when a governing release
//! declares them, taking the merged attribute value so the two never disagree.
//!
//! ## Carried-forward fields
//!
//! `dateAdded` and `image` are copied from the prior catalog entry with the
//! same id. A new model is stamped with the build time and gets its image from
//! [`preview::resolve`].

use crate::document::{ModelMeta, RELEASE_KEYS};
use crate::naming;
use crate::preview;
use crate::release::{ReleaseIndex, ReleaseRecord};
use crate::types::{Attribute, ModelEntry, find_attribute};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

/// Hex characters of the identity digest kept in an id.
pub const ID_DIGEST_LEN: usize = 12;

const FALLBACK_NAME: &str = "Untitled";

/// Read-only inputs shared by every model of one build.
pub struct BuildContext<'a> {
    pub root: &'a Path,
    pub releases: &'a ReleaseIndex,
    pub prior: &'a HashMap<String, ModelEntry>,
    pub now: DateTime<Utc>,
}

/// A built entry plus the configured cover, kept for image re-resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltModel {
    pub entry: ModelEntry,
    pub cover: Option<String>,
}

/// Stable identity for a model name at a relative path.
pub fn model_id(name: &str, relative_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"\0");
    hasher.update(relative_path.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    let slug = naming::slugify(name);
    let slug = if slug.is_empty() { "model" } else { &slug };
    format!("{}-{}", slug, &digest[..ID_DIGEST_LEN])
}

/// Build the catalog entry for the model config at `config_path`.
pub fn build_model(ctx: &BuildContext<'_>, config_path: &Path, meta: ModelMeta) -> BuiltModel {
    let model_dir = config_path.parent().unwrap_or(ctx.root);
    let segments = naming::relative_segments(model_dir, ctx.root);
    let relative = segments.join("/");

    let derived = naming::directory_name(model_dir);
    let name = naming::resolve(&[meta.name.as_deref(), derived.as_deref()])
        .unwrap_or_else(|| FALLBACK_NAME.to_string());
    let id = model_id(&name, &relative);

    let applicable = ctx.releases.applicable(model_dir);
    let (tags, attributes) = merge_inherited(meta.tags, meta.attributes, &applicable);
    let release = promoted(&attributes, &applicable, RELEASE_KEYS[0]);
    let subscription = promoted(&attributes, &applicable, RELEASE_KEYS[1]);

    let prior = ctx.prior.get(&id);
    let image = prior.and_then(|p| p.image.clone()).or_else(|| {
        preview::resolve(model_dir, meta.cover.as_deref())
            .map(|p| p.to_string_lossy().into_owned())
    });

    let entry = ModelEntry {
        id,
        name,
        notes: meta.notes.trim().to_string(),
        tags,
        collections: meta.collections,
        attributes,
        release,
        subscription,
        directory_collection: segments.first().cloned(),
        source_path: model_dir.to_string_lossy().into_owned(),
        relative_source_path: relative,
        image,
        date_added: prior.map(|p| p.date_added).unwrap_or(ctx.now),
    };

    BuiltModel {
        entry,
        cover: meta.cover,
    }
}

/// Union the model's own tags and attributes with those of its releases.
///
/// First value wins for both, so own values take precedence over any release
/// and `releases` must already be ordered nearest first.
pub fn merge_inherited(
    own_tags: Vec<String>,
    own_attributes: Vec<Attribute>,
    releases: &[&ReleaseRecord],
) -> (Vec<String>, Vec<Attribute>) {
    let mut tags: Vec<String> = Vec::with_capacity(own_tags.len());
    for tag in own_tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    let mut attributes = own_attributes;

    for release in releases {
        for attr in &release.attributes {
            if find_attribute(&attributes, &attr.key).is_none() {
                attributes.push(attr.clone());
            }
        }
        for tag in &release.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }

    (tags, attributes)
}

fn promoted(attributes: &[Attribute], releases: &[&ReleaseRecord], key: &str) -> Option<String> {
    let declared = releases
        .iter()
        .any(|r| find_attribute(&r.attributes, key).is_some());
    if declared {
        find_attribute(attributes, key).and_then(Attribute::text)
    } else {
        None
    }
}
