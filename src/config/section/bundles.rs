//! `[bundles]` section.
//!
//! ```toml
//! [bundles]
//! "app.js" = ["jquery.js", "app.js"]
//! "vendor.css" = ["bootstrap.css"]
//! ```
//!
//! Declaration order is kept; it is the order of the digest manifest.

use indexmap::IndexMap;

use crate::config::ConfigDiagnostics;
use crate::utils::path::is_contained;

/// A named, ordered group of logical asset names processed into one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub assets: Vec<String>,
}

impl Bundle {
    pub fn new<I>(name: impl Into<String>, assets: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            name: name.into(),
            assets: assets.into_iter().collect(),
        }
    }
}

pub(in crate::config) fn collect(raw: &IndexMap<String, Vec<String>>) -> Vec<Bundle> {
    raw.iter()
        .map(|(name, assets)| Bundle::new(name.clone(), assets.iter().cloned()))
        .collect()
}

pub(in crate::config) fn validate(raw: &IndexMap<String, Vec<String>>, diag: &mut ConfigDiagnostics) {
    if raw.is_empty() {
        diag.warn("bundles", "no bundles declared, nothing will be built");
    }

    for (name, assets) in raw {
        let field = format!("bundles.\"{name}\"");

        if name.trim().is_empty() {
            diag.error("bundles", "bundle name must not be empty");
            continue;
        }
        if !is_contained(name) {
            diag.error_with_hint(
                field.clone(),
                format!("bundle name `{name}` escapes the output directory"),
                "use a relative name without `..`, e.g. \"js/app.js\"",
            );
        }
        if assets.is_empty() {
            diag.error_with_hint(
                field.clone(),
                "bundle has no assets",
                "list at least one asset, e.g. [\"app.js\"]",
            );
        }
        for asset in assets {
            if asset.trim().is_empty() {
                diag.error(field.clone(), "asset name must not be empty");
            } else if !is_contained(asset) {
                diag.error(
                    field.clone(),
                    format!("asset name `{asset}` must be a relative path without `..`"),
                );
            }
        }
    }
}
