//! Shared index handle with atomic replacement.
//!
//! Uses `arc-swap` for lock-free reads: a rescan builds a complete new index
//! and swaps it in, so readers never see a half-built one. A failed rescan
//! leaves the previous index in service.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::index::{IndexError, SuffixIndex};
use super::scan::{SearchRoot, scan_roots};

pub struct IndexStore {
    roots: Vec<SearchRoot>,
    strict: bool,
    current: ArcSwap<SuffixIndex>,
}

impl IndexStore {
    /// Scan `roots` and build the first index.
    pub fn open(roots: Vec<SearchRoot>, strict: bool) -> Result<Self, IndexError> {
        let index = SuffixIndex::build(scan_roots(&roots), strict)?;
        Ok(Self {
            roots,
            strict,
            current: ArcSwap::from_pointee(index),
        })
    }

    #[inline]
    pub fn load(&self) -> Arc<SuffixIndex> {
        self.current.load_full()
    }

    /// Rebuild from disk and swap on success.
    ///
    /// Returns the new asset count.
    pub fn rescan(&self) -> Result<usize, IndexError> {
        let index = SuffixIndex::build(scan_roots(&self.roots), self.strict)?;
        let count = index.len();
        self.current.store(Arc::new(index));
        Ok(count)
    }

    pub fn roots(&self) -> &[SearchRoot] {
        &self.roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_rescan_picks_up_new_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "a").unwrap();

        let store = IndexStore::open(vec![SearchRoot::project(dir.path())], false).unwrap();
        assert!(store.load().resolve("b.js").is_err());

        fs::write(dir.path().join("b.js"), "b").unwrap();
        assert_eq!(store.rescan().unwrap(), 2);
        assert!(store.load().resolve("b.js").is_ok());
    }

    #[test]
    fn test_failed_rescan_keeps_previous_index() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("v1")).unwrap();
        fs::write(dir.path().join("v1/lib.js"), "1").unwrap();

        let store = IndexStore::open(vec![SearchRoot::library(dir.path())], true).unwrap();
        let before = store.load();

        fs::create_dir_all(dir.path().join("v2")).unwrap();
        fs::write(dir.path().join("v2/lib.js"), "2").unwrap();

        assert!(matches!(store.rescan(), Err(IndexError::Conflict { .. })));
        assert!(Arc::ptr_eq(&before, &store.load()));
        assert!(store.load().resolve("lib.js").is_ok());
    }
}
