//! Suffix index: locate an asset by any trailing portion of its path.
//!
//! Every asset path is registered under its suffix key (segments reversed and
//! joined with `/`) and under every leaf-truncated prefix of that key:
//!
//! ```text
//! webjars/jquery/3.1.0/jquery.js
//!   jquery.js
//!   jquery.js/3.1.0
//!   jquery.js/3.1.0/jquery
//!   jquery.js/3.1.0/jquery/webjars     (full key)
//! ```
//!
//! A truncation shared by several assets is kept as ambiguous with its
//! candidates, so resolving it fails loudly instead of picking one.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::scan::AssetPath;
use crate::utils::path::logical_segments;

/// Errors from building or querying the index.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("duplicate key `{key}`: `{}` and `{}`", existing.display(), incoming.display())]
    Conflict {
        key: String,
        existing: PathBuf,
        incoming: PathBuf,
    },

    #[error("no asset matches `{0}`")]
    NotFound(String),

    #[error("`{partial}` is ambiguous, candidates: {}", candidates.join(", "))]
    Ambiguous {
        partial: String,
        candidates: Vec<String>,
    },
}

/// Build the suffix key for a `/`-separated path.
///
/// `webjars/jquery/jquery.js` → `jquery.js/jquery/webjars`
pub fn suffix_key(path: &str) -> String {
    let mut segments = logical_segments(path);
    segments.reverse();
    segments.join("/")
}

#[derive(Debug, Clone)]
enum Slot {
    Unique(usize),
    Ambiguous(Vec<usize>),
}

/// Immutable suffix index over one scan of the asset roots.
#[derive(Debug, Default)]
pub struct SuffixIndex {
    assets: Vec<AssetPath>,
    /// Full suffix key → asset
    exact: FxHashMap<String, usize>,
    /// Every truncation → asset(s)
    truncations: FxHashMap<String, Slot>,
}

impl SuffixIndex {
    /// Build an index, visiting every asset once.
    ///
    /// - Same relative path, different precedence: the higher precedence
    ///   asset shadows the other.
    /// - Same relative path, same precedence: [`IndexError::Conflict`].
    /// - `strict`: two assets sharing a file name is a conflict too.
    pub fn build<I>(assets: I, strict: bool) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = AssetPath>,
    {
        let mut index = Self::default();

        for asset in assets {
            let key = suffix_key(&asset.relative);
            if key.is_empty() {
                continue;
            }

            if let Some(&existing) = index.exact.get(&key) {
                let current = &index.assets[existing];
                if current.absolute == asset.absolute {
                    continue;
                }
                if current.precedence == asset.precedence {
                    return Err(IndexError::Conflict {
                        key,
                        existing: current.absolute.clone(),
                        incoming: asset.absolute,
                    });
                }
                if current.precedence < asset.precedence {
                    crate::debug!("index"; "{} shadows {}", current.absolute.display(), asset.absolute.display());
                    continue;
                }
                crate::debug!("index"; "{} shadows {}", asset.absolute.display(), current.absolute.display());
                index.assets[existing] = asset;
                continue;
            }

            let id = index.assets.len();
            index.exact.insert(key, id);
            index.assets.push(asset);
        }

        index.register_truncations(strict)?;
        Ok(index)
    }

    fn register_truncations(&mut self, strict: bool) -> Result<(), IndexError> {
        for (id, asset) in self.assets.iter().enumerate() {
            let mut segments = logical_segments(&asset.relative);
            segments.reverse();

            for depth in 1..=segments.len() {
                let key = segments[..depth].join("/");
                match self.truncations.get_mut(&key) {
                    None => {
                        self.truncations.insert(key, Slot::Unique(id));
                    }
                    Some(slot) => {
                        let first = match slot {
                            Slot::Unique(first) => *first,
                            Slot::Ambiguous(ids) => ids[0],
                        };
                        if strict && depth == 1 {
                            return Err(IndexError::Conflict {
                                key,
                                existing: self.assets[first].absolute.clone(),
                                incoming: asset.absolute.clone(),
                            });
                        }
                        match slot {
                            Slot::Unique(prev) => {
                                let prev = *prev;
                                *slot = Slot::Ambiguous(vec![prev, id]);
                            }
                            Slot::Ambiguous(ids) => ids.push(id),
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve a right-aligned partial path to its asset.
    ///
    /// The partial is normalized first (either separator, no empty or `.`
    /// segments). An exact full-path match wins over truncations of longer
    /// paths.
    pub fn resolve(&self, partial: &str) -> Result<&AssetPath, IndexError> {
        let key = suffix_key(partial);
        if key.is_empty() {
            return Err(IndexError::NotFound(partial.to_string()));
        }

        if let Some(&id) = self.exact.get(&key) {
            return Ok(&self.assets[id]);
        }

        match self.truncations.get(&key) {
            Some(Slot::Unique(id)) => Ok(&self.assets[*id]),
            Some(Slot::Ambiguous(ids)) => {
                let mut candidates: Vec<String> = ids
                    .iter()
                    .map(|&id| self.assets[id].relative.clone())
                    .collect();
                candidates.sort();
                Err(IndexError::Ambiguous {
                    partial: partial.to_string(),
                    candidates,
                })
            }
            None => Err(IndexError::NotFound(partial.to_string())),
        }
    }

    /// Resolve to the asset's absolute location.
    #[inline]
    pub fn resolve_path(&self, partial: &str) -> Result<&Path, IndexError> {
        self.resolve(partial).map(|asset| asset.absolute.as_path())
    }

    /// Assets that survived shadowing, in registration order.
    pub fn assets(&self) -> &[AssetPath] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
