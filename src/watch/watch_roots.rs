use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Watch-root consistency manager.
///
/// Asset roots may not exist yet (library dirs are unpacked by the host
/// build) or may be deleted and recreated while watching. Missing roots are
/// attached as soon as they appear.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    pub(super) fn attach_existing(
        &mut self,
        watcher: &mut RecommendedWatcher,
    ) -> notify::Result<()> {
        for path in &self.desired {
            if !path.is_dir() {
                continue;
            }
            watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
        }

        Ok(())
    }

    /// Re-attach roots that were removed and recreated.
    ///
    /// Returns true if any root was attached, since files under it were
    /// never seen by the watcher and need a rescan.
    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) -> bool {
        self.attached.retain(|path| path.is_dir());

        let mut attached_any = false;
        for path in &self.desired {
            if self.attached.contains(path) || !path.is_dir() {
                continue;
            }

            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                attached_any = true;
                crate::debug!("watch"; "re-attached watch: {}", path.display());
            }
        }
        attached_any
    }

    pub(super) fn attached_count(&self) -> usize {
        self.attached.len()
    }
}
