//! `humpty resolve`: look up partial asset paths.

use anyhow::{Result, bail};

use crate::config::HumptyConfig;
use crate::utils::plural_count;
use crate::{debug, log};

/// Print one resolved path per line, in argument order.
///
/// Every path is attempted; the command fails if any did not resolve.
pub fn run_resolve(paths: &[String], config: &HumptyConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let index = store.load();

    let mut failed = 0;
    for partial in paths {
        match index.resolve(partial) {
            Ok(asset) => {
                debug!("resolve"; "{} -> {} ({})", partial, asset.relative, asset.precedence.label());
                println!("{}", asset.absolute.display());
            }
            Err(e) => {
                log!("error"; "{}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} could not be resolved", plural_count(failed, "path"));
    }
    Ok(())
}
