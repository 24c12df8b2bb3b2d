//! Production digest build.
//!
//! Every bundle is processed, its bytes hashed, and the output written under
//! the build directory with the digest in its name. The manifest mapping
//! bundle names to those outputs is written last, and only when every bundle
//! succeeded, so a failed build never publishes a partial manifest.

mod hash;
mod manifest;

use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::config::Bundle;
use crate::pipeline::BundleProcessor;
use crate::utils::{fs::write_atomic, plural_count};
use crate::{debug, log};

pub use hash::{ContentDigest, qualified_name};
pub use manifest::Manifest;

struct Output<'a> {
    bundle: &'a str,
    name: String,
    bytes: Vec<u8>,
}

/// Build every bundle and write the manifest to `manifest_path`.
///
/// Bundles are processed in parallel; outputs are written and the manifest
/// is ordered by declaration.
pub fn build_manifest(
    processor: &dyn BundleProcessor,
    bundles: &[Bundle],
    build_dir: &Path,
    manifest_path: &Path,
) -> Result<Manifest> {
    let outputs = bundles
        .par_iter()
        .map(|bundle| -> Result<Output<'_>> {
            let processed = processor
                .process(&bundle.name)
                .with_context(|| format!("failed to process bundle `{}`", bundle.name))?;
            let digest = ContentDigest::of(&processed.bytes);
            Ok(Output {
                bundle: &bundle.name,
                name: qualified_name(&bundle.name, digest),
                bytes: processed.bytes,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut manifest = Manifest::new();
    for output in outputs {
        let target = build_dir.join(&output.name);
        write_atomic(&target, &output.bytes)
            .with_context(|| format!("failed to write `{}`", target.display()))?;
        debug!("digest"; "{} -> {}", output.bundle, output.name);
        manifest.insert(output.bundle, output.name);
    }

    if let Some(previous) = Manifest::read(manifest_path) {
        let changed = manifest.changed_since(&previous);
        debug!("digest"; "{} changed since the previous build", plural_count(changed, "entry name"));
    }

    manifest
        .write(manifest_path)
        .with_context(|| format!("failed to write manifest `{}`", manifest_path.display()))?;

    log!("digest"; "wrote {} to {}", plural_count(manifest.len(), "bundle"), build_dir.display());
    Ok(manifest)
}
