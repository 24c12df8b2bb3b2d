//! `[options]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [options]
//! build_dir = "target/humpty"          # Digest build output directory
//! digest_file = "humpty-digest.toml"   # Manifest written by `humpty digest`
//! watch_file = "humpty-watch.toml"     # Handoff file written by `humpty watch`
//! assets_dir = "assets"                # Project assets
//! library_dirs = ["target/webjars"]    # Unpacked third-party archives
//! strict_suffixes = false              # Reject shared file names at index build
//! ```
//!
//! Relative paths resolve against the directory holding `humpty.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::asset::SearchRoot;
use crate::utils::path::normalize_path;

/// Global paths and index behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub build_dir: PathBuf,
    pub digest_file: PathBuf,
    pub watch_file: PathBuf,

    /// Project assets. Shadow library assets with the same relative path.
    pub assets_dir: PathBuf,

    /// Library asset roots, in addition to `assets_dir`.
    pub library_dirs: Vec<PathBuf>,

    /// Fail index construction when two assets share a file name, instead
    /// of reporting the ambiguity when the short name is resolved.
    pub strict_suffixes: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            build_dir: "target/humpty".into(),
            digest_file: "humpty-digest.toml".into(),
            watch_file: "humpty-watch.toml".into(),
            assets_dir: "assets".into(),
            library_dirs: vec!["target/webjars".into()],
            strict_suffixes: false,
        }
    }
}

impl OptionsConfig {
    /// Make every path absolute against `root`.
    pub fn normalize(&mut self, root: &Path) {
        let join = |p: &Path| normalize_path(&root.join(p));

        self.build_dir = join(&self.build_dir);
        self.digest_file = join(&self.digest_file);
        self.watch_file = join(&self.watch_file);
        self.assets_dir = join(&self.assets_dir);
        self.library_dirs = self.library_dirs.iter().map(|p| join(p)).collect();
    }

    /// Asset search roots, project first.
    pub fn search_roots(&self) -> Vec<SearchRoot> {
        std::iter::once(SearchRoot::project(&self.assets_dir))
            .chain(self.library_dirs.iter().map(SearchRoot::library))
            .collect()
    }
}
