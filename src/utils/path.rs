//! Path normalization.
//!
//! - `normalize_path`: filesystem paths (canonicalize with a fallback)
//! - `logical_segments`: `/`-separated asset names split into clean segments
//! - `is_contained`: whether a relative name stays inside its base directory

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Split a logical asset name into its segments.
///
/// Accepts both separators, drops empty and `.` segments, so
/// `"\\webjars//jquery/./jquery.js/"` becomes `["webjars", "jquery", "jquery.js"]`.
pub fn logical_segments(name: &str) -> Vec<&str> {
    name.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

/// Join segments with `/`, the separator used for every logical name.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `name` is relative and never climbs out of its base directory.
pub fn is_contained(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && !name.starts_with(['/', '\\'])
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && !logical_segments(name).contains(&"..")
}
