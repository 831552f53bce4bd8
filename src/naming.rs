//! Name and path helpers shared by the model builder and the materializer.
//!
//! ## Display Names
//!
//! A model's display name comes from `modelMeta.name` when the config sets a
//! non-blank one. Otherwise it is the last non-empty segment of the model's
//! directory:
//! - `Collection1/Goblin` → "Goblin"
//! - `Minis/Orc Warband/` → "Orc Warband"
//!
//! ## Slugs
//!
//! Slugs prefix model identities (`goblin-3fa9c01e2b7d`), so they must stay
//! readable in a grep and safe in filenames: lowercase ASCII alphanumerics and
//! single dashes only.

use std::path::{Component, Path};

const MAX_SLUG_LEN: usize = 48;

/// Resolve a field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-blank value, trimmed.
///
/// ```text
/// name: resolve(&[config_name, directory_name])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Normal path segments of `path` below `root`, in order.
///
/// Returns an empty list when `path` is `root` itself or lies outside it.
/// Joined with `/`, this is the host-independent relative path that
/// identities hash.
pub fn relative_segments(path: &Path, root: &Path) -> Vec<String> {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Last non-empty segment of a directory path, used as a fallback model name.
pub fn directory_name(dir: &Path) -> Option<String> {
    dir.components().rev().find_map(|c| match c {
        Component::Normal(s) => {
            let name = s.to_string_lossy();
            let trimmed = name.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    })
}

/// Lowercase slug for use in identities and filenames.
///
/// - Lowercases ASCII letters
/// - Replaces anything that is not an ASCII alphanumeric with a dash
/// - Collapses consecutive dashes and strips leading/trailing ones
/// - Truncates to `MAX_SLUG_LEN` characters, breaking at the last dash
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');

    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}
