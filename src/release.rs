//! Release index: the first pass of config resolution.
//!
//! Release configs declare attributes and tags that every model below them
//! inherits. Because a release can sit anywhere in the tree and be discovered
//! after the models it governs, all releases are collected into a
//! [`ReleaseIndex`] before any model is built. The index is an explicit value
//! handed to the model builder; nothing is cached globally.
//!
//! ## Containment
//!
//! A release governs the directory holding its config file and everything
//! below it. Containment is tested per path component ([`Path::starts_with`]),
//! so a release in `/lib/foo` never applies to `/lib/foo-bar`.
//!
//! ## Merge order
//!
//! [`ReleaseIndex::applicable`] returns the governing releases deepest first,
//! with ties kept in traversal order. The builder keeps the first value it
//! sees for each attribute key, so the nearest release wins over its
//! ancestors.

use crate::document::ReleaseDecl;
use crate::types::Attribute;
use std::path::{Path, PathBuf};

/// One release config, keyed by its file path.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRecord {
    pub config_path: PathBuf,
    pub governed_dir: PathBuf,
    pub attributes: Vec<Attribute>,
    pub tags: Vec<String>,
}

impl ReleaseRecord {
    pub fn new(config_path: &Path, decl: ReleaseDecl) -> Self {
        let governed_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            config_path: config_path.to_path_buf(),
            governed_dir,
            attributes: decl.attributes,
            tags: decl.tags,
        }
    }

    /// Whether `dir` is the governed directory or nested anywhere below it.
    pub fn governs(&self, dir: &Path) -> bool {
        dir.starts_with(&self.governed_dir)
    }

    fn depth(&self) -> usize {
        self.governed_dir.components().count()
    }
}

/// All release configs of a build, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ReleaseIndex {
    records: Vec<ReleaseRecord>,
}

impl ReleaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ReleaseRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ReleaseRecord] {
        &self.records
    }

    /// Releases governing `model_dir`, deepest governed directory first.
    pub fn applicable(&self, model_dir: &Path) -> Vec<&ReleaseRecord> {
        let mut found: Vec<&ReleaseRecord> = self
            .records
            .iter()
            .filter(|r| r.governs(model_dir))
            .collect();
        // Stable sort keeps discovery order among releases at the same depth.
        found.sort_by_key(|r| std::cmp::Reverse(r.depth()));
        found
    }
}

impl FromIterator<ReleaseRecord> for ReleaseIndex {
    fn from_iter<I: IntoIterator<Item = ReleaseRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
