//! Directory crawling.
//!
//! Stage 1 of the catalog build. Walks the model library and collects every
//! regular file named with the config filename, at any depth:
//!
//! ```text
//! models/                              # Scan root
//! ├── Collection1/
//! │   ├── config.orynt3d               # Release config (governs Collection1/**)
//! │   ├── Goblin/
//! │   │   ├── config.orynt3d           # Model config
//! │   │   ├── cover.png
//! │   │   └── goblin.stl
//! │   └── Orc/
//! │       ├── config.orynt3d
//! │       └── images/
//! │           └── orc.jpg
//! └── Loose/
//!     └── config.orynt3d               # Model config, no release applies
//! ```
//!
//! ## Ordering
//!
//! Traversal is sorted by file name at every level, so an unchanged tree
//! always yields the same config order. Identity does not depend on it, but
//! duplicate tie-breaks and release merge order do.
//!
//! ## Failures
//!
//! A missing root is fatal. An unreadable directory is reported as a
//! [`BuildEvent::CrawlError`] and counted; the walk continues with its
//! siblings so one bad directory never loses the rest of the tree.

use crate::pipeline::{BuildEvent, emit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source root not found or not a directory: {0}")]
    RootNotFound(PathBuf),
}

/// Counters gathered while walking the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    pub directories: u64,
    pub files: u64,
    pub errors: u64,
}

/// Config files found by a crawl, in traversal order.
#[derive(Debug, Default)]
pub struct CrawlResult {
    pub configs: Vec<PathBuf>,
    pub stats: CrawlStats,
}

/// Walk `root` and collect all files named `config_filename`.
///
/// Emits [`BuildEvent::CrawlProgress`] every `progress_interval` directories.
pub fn crawl(
    root: &Path,
    config_filename: &str,
    progress_interval: u64,
    events: Option<&Sender<BuildEvent>>,
) -> Result<CrawlResult, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }

    let mut result = CrawlResult::default();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                result.stats.errors += 1;
                emit(
                    events,
                    BuildEvent::CrawlError {
                        path: err.path().map(Path::to_path_buf),
                        message: err.to_string(),
                    },
                );
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            result.stats.directories += 1;
            if progress_interval > 0 && result.stats.directories % progress_interval == 0 {
                emit(
                    events,
                    BuildEvent::CrawlProgress {
                        directories: result.stats.directories,
                        files: result.stats.files,
                    },
                );
            }
        } else if file_type.is_file() {
            result.stats.files += 1;
            if entry.file_name() == config_filename {
                result.configs.push(entry.into_path());
            }
        }
    }

    Ok(result)
}
