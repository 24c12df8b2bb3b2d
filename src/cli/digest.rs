//! `humpty digest`: production build.

use anyhow::Result;

use crate::config::HumptyConfig;
use crate::digest::build_manifest;
use crate::log;
use crate::pipeline::ConcatProcessor;

pub fn run_digest(config: &HumptyConfig) -> Result<()> {
    let bundles = config.bundles();
    let store = super::open_store(config)?;
    let processor = ConcatProcessor::new(store, &bundles);

    build_manifest(
        &processor,
        &bundles,
        &config.options.build_dir,
        &config.options.digest_file,
    )?;

    log!("digest"; "manifest: {}", config.root_relative(&config.options.digest_file).display());
    Ok(())
}
