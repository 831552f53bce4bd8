//! Preview image resolution for a model directory.
//!
//! Model folders are filled by many different tools, so there is no single
//! naming rule for the picture that represents a model. [`resolve`] searches
//! in a fixed priority order and stops at the first hit:
//!
//! 1. A `.png` whose name starts with `fn` or contains `preview`
//! 2. Any `.png`
//! 3. The configured cover, verbatim, then with each image extension appended
//!    when the configured name has none
//! 4. Any file with an image extension
//! 5. Any image inside an `images/`, `thumbnails/`, `preview/` or `previews/`
//!    child directory
//!
//! Directory listings are sorted by file name, so "first" is stable across
//! runs. Hidden files (`.`-prefixed, e.g. `._cover.png` resource forks) are
//! never candidates. Finding nothing is a normal outcome: the caller assigns
//! the shared placeholder.

use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

const IMAGE_SUBDIRS: &[&str] = &["images", "thumbnails", "preview", "previews"];

/// Find a representative image for `model_dir`.
pub fn resolve(model_dir: &Path, cover: Option<&str>) -> Option<PathBuf> {
    let files = list_files(model_dir);

    files
        .iter()
        .find(|p| has_extension(p, "png") && is_preview_name(p))
        .or_else(|| files.iter().find(|p| has_extension(p, "png")))
        .cloned()
        .or_else(|| configured_cover(model_dir, cover))
        .or_else(|| files.iter().find(|p| is_image(p)).cloned())
        .or_else(|| {
            IMAGE_SUBDIRS
                .iter()
                .map(|name| model_dir.join(name))
                .filter(|dir| dir.is_dir())
                .find_map(|dir| list_files(&dir).into_iter().find(|p| is_image(p)))
        })
}

/// Whether `path` has one of the image extensions (case-insensitive).
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(wanted))
}

fn is_preview_name(path: &Path) -> bool {
    let name = file_name_lower(path);
    name.starts_with("fn") || name.contains("preview")
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn configured_cover(model_dir: &Path, cover: Option<&str>) -> Option<PathBuf> {
    let cover = cover.map(str::trim).filter(|c| !c.is_empty())?;

    let verbatim = model_dir.join(cover);
    if verbatim.is_file() {
        return Some(verbatim);
    }
    if Path::new(cover).extension().is_some() {
        return None;
    }
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| model_dir.join(format!("{cover}.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Regular, non-hidden files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && !file_name_lower(p).starts_with('.'))
        .collect();
    files.sort();
    files
}
