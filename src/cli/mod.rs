//! Command-line interface module.

mod args;
pub mod digest;
pub mod resolve;
pub mod watch;

pub use args::{Cli, Commands};

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::asset::IndexStore;
use crate::config::HumptyConfig;
use crate::utils::plural_count;
use crate::debug;

/// Scan the configured asset roots into a shared index.
pub(crate) fn open_store(config: &HumptyConfig) -> Result<Arc<IndexStore>> {
    let store = IndexStore::open(
        config.options.search_roots(),
        config.options.strict_suffixes,
    )
    .context("failed to index assets")?;

    debug!("index"; "indexed {}", plural_count(store.load().len(), "asset"));
    Ok(Arc::new(store))
}
