//! Asset scanning (pure, no side effects).

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use crate::utils::path::{normalize_path, to_slash};

/// Which kind of search root an asset came from.
///
/// Project assets are consulted before library assets, so a project file
/// shadows a library file with the same relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    Project,
    Library,
}

impl Precedence {
    pub fn label(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Library => "library",
        }
    }
}

/// A directory scanned for assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoot {
    pub dir: PathBuf,
    pub precedence: Precedence,
}

impl SearchRoot {
    pub fn project(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            precedence: Precedence::Project,
        }
    }

    pub fn library(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            precedence: Precedence::Library,
        }
    }
}

/// One physical asset file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetPath {
    /// Path relative to its search root, `/`-separated.
    pub relative: String,
    /// Absolute location on disk.
    pub absolute: PathBuf,
    pub precedence: Precedence,
}

impl AssetPath {
    pub fn new(
        relative: impl Into<String>,
        absolute: impl Into<PathBuf>,
        precedence: Precedence,
    ) -> Self {
        Self {
            relative: relative.into(),
            absolute: absolute.into(),
            precedence,
        }
    }
}

/// Scan every existing root, returning assets in root order then name order.
///
/// Hidden files and directories are skipped, matching the watcher's
/// temp-file filter. Missing roots contribute nothing.
pub fn scan_roots(roots: &[SearchRoot]) -> Vec<AssetPath> {
    roots.iter().flat_map(scan_root).collect()
}

fn scan_root(root: &SearchRoot) -> Vec<AssetPath> {
    if !root.dir.is_dir() {
        return Vec::new();
    }
    let base = normalize_path(&root.dir);

    let mut assets: Vec<AssetPath> = WalkDir::new(&base)
        .skip_hidden(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let path = e.path();
            let relative = relative_name(&path, &base)?;
            Some(AssetPath::new(relative, path, root.precedence))
        })
        .collect();
    assets.sort_by(|a, b| a.relative.cmp(&b.relative));
    assets
}

fn relative_name(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let name = to_slash(rel);
    (!name.is_empty()).then_some(name)
}
