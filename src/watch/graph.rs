//! File → bundle dependency tracking.
//!
//! Each bundle links to two sets of files:
//! - the files its logical asset names currently resolve to (seeded from the
//!   index, refreshed after every rescan)
//! - the files its last successful build declared as dependencies
//!
//! The reverse mapping (file → bundles) is the union of both, and answers
//! "which bundles must be rebuilt when this file changes".
//!
//! # Invariants
//! - `reverse` always equals the union of `resolved` and `declared`
//! - Paths are stored exactly as the index and the processor report them

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::asset::SuffixIndex;
use crate::config::Bundle;

type PathSet = FxHashSet<PathBuf>;

#[derive(Debug, Default)]
pub(super) struct BundleGraph {
    /// Bundle → resolved location of each declared asset, `None` if unresolvable
    resolved: FxHashMap<String, Vec<Option<PathBuf>>>,
    /// Bundle → files its last successful build read
    declared: FxHashMap<String, PathSet>,
    /// File → bundles using it
    reverse: FxHashMap<PathBuf, FxHashSet<String>>,
}

impl BundleGraph {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Resolve every bundle's assets against `index`.
    ///
    /// Returns the bundles whose resolution changed since the last seed
    /// (all of them on the first call).
    pub(super) fn seed(&mut self, bundles: &[Bundle], index: &SuffixIndex) -> FxHashSet<String> {
        let mut changed = FxHashSet::default();

        for bundle in bundles {
            let resolution: Vec<Option<PathBuf>> = bundle
                .assets
                .iter()
                .map(|asset| index.resolve_path(asset).ok().map(Path::to_path_buf))
                .collect();

            if self.resolved.get(&bundle.name) == Some(&resolution) {
                continue;
            }

            self.unlink(&bundle.name);
            self.resolved.insert(bundle.name.clone(), resolution);
            self.link(&bundle.name);
            changed.insert(bundle.name.clone());
        }

        changed
    }

    /// Record the dependencies a successful build declared.
    ///
    /// Replaces the bundle's previous declared dependencies.
    pub(super) fn record(&mut self, bundle: &str, dependencies: &[PathBuf]) {
        self.unlink(bundle);
        self.declared
            .insert(bundle.to_string(), dependencies.iter().cloned().collect());
        self.link(bundle);
    }

    /// Bundles that use `file`.
    pub(super) fn used_by(&self, file: &Path) -> impl Iterator<Item = &str> {
        self.reverse
            .get(file)
            .into_iter()
            .flat_map(|bundles| bundles.iter().map(String::as_str))
    }

    /// Number of files tracked (for debugging).
    pub(super) fn file_count(&self) -> usize {
        self.reverse.len()
    }

    // -------------------------------------------------------------------------
    // Private
    // -------------------------------------------------------------------------

    fn files_of<'a>(&'a self, bundle: &str) -> impl Iterator<Item = &'a PathBuf> + 'a {
        let resolved = self
            .resolved
            .get(bundle)
            .into_iter()
            .flat_map(|paths| paths.iter().flatten());
        let declared = self.declared.get(bundle).into_iter().flatten();
        resolved.chain(declared)
    }

    fn link(&mut self, bundle: &str) {
        let files: Vec<PathBuf> = self.files_of(bundle).cloned().collect();
        for file in files {
            self.reverse
                .entry(file)
                .or_default()
                .insert(bundle.to_string());
        }
    }

    fn unlink(&mut self, bundle: &str) {
        let files: Vec<PathBuf> = self.files_of(bundle).cloned().collect();
        for file in files {
            if let Some(bundles) = self.reverse.get_mut(&file) {
                bundles.remove(bundle);
                if bundles.is_empty() {
                    self.reverse.remove(&file);
                }
            }
        }
    }
}
