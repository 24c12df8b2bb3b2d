use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{BundleProcessor, ProcessError, Processed};
use crate::asset::{IndexError, IndexStore};
use crate::config::Bundle;

/// Joins a bundle's assets in declaration order.
///
/// Each part is newline-terminated so the last statement of one file cannot
/// run into the first of the next. A name that is not a bundle is resolved as
/// a single asset and returned verbatim.
pub struct ConcatProcessor {
    store: Arc<IndexStore>,
    bundles: IndexMap<String, Vec<String>>,
}

impl ConcatProcessor {
    pub fn new(store: Arc<IndexStore>, bundles: &[Bundle]) -> Self {
        Self {
            store,
            bundles: bundles
                .iter()
                .map(|b| (b.name.clone(), b.assets.clone()))
                .collect(),
        }
    }

    fn read(path: PathBuf) -> Result<(Vec<u8>, PathBuf), ProcessError> {
        match fs::read(&path) {
            Ok(bytes) => Ok((bytes, path)),
            Err(source) => Err(ProcessError::Read { path, source }),
        }
    }
}

impl BundleProcessor for ConcatProcessor {
    fn process(&self, name: &str) -> Result<Processed, ProcessError> {
        let index = self.store.load();

        let Some(assets) = self.bundles.get(name) else {
            let path = match index.resolve_path(name) {
                Ok(path) => path.to_path_buf(),
                Err(IndexError::NotFound(_)) => {
                    return Err(ProcessError::UnknownBundle(name.to_string()));
                }
                Err(source) => {
                    return Err(ProcessError::Resolve {
                        bundle: name.to_string(),
                        asset: name.to_string(),
                        source,
                    });
                }
            };
            let (bytes, path) = Self::read(path)?;
            return Ok(Processed {
                bytes,
                dependencies: vec![path],
            });
        };

        let mut out = Processed::default();
        for asset in assets {
            let path = index
                .resolve_path(asset)
                .map_err(|source| ProcessError::Resolve {
                    bundle: name.to_string(),
                    asset: asset.clone(),
                    source,
                })?
                .to_path_buf();

            let (bytes, path) = Self::read(path)?;
            out.bytes.extend_from_slice(&bytes);
            if !bytes.ends_with(b"\n") {
                out.bytes.push(b'\n');
            }
            out.dependencies.push(path);
        }
        Ok(out)
    }
}
