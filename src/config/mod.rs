//! Project configuration management for `humpty.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── bundles    # [bundles]
//! │   ├── options    # [options]
//! │   └── watch      # [watch]
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # config file discovery
//! └── mod.rs         # HumptyConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | `[options]` | Build dir, manifest/handoff paths, asset roots       |
//! | `[watch]`   | Watch mode timing                                    |
//! | `[bundles]` | Ordered bundle name → logical asset names            |

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use section::{Bundle, OptionsConfig, WatchConfig};

use util::find_config_file;

use crate::cli::{Cli, Commands};
use crate::utils::path::normalize_path;
use crate::{debug, log};
use anyhow::Result;
use indexmap::IndexMap;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing humpty.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HumptyConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    pub options: OptionsConfig,

    pub watch: WatchConfig,

    /// Raw `[bundles]` table, in declaration order.
    #[serde(rename = "bundles")]
    raw_bundles: IndexMap<String, Vec<String>>,
}

impl HumptyConfig {
    /// Locate, parse, normalize and validate the config for this invocation.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|err| ConfigError::Io(PathBuf::from("."), err))?;
        let config_path = find_config_file(&cli.config, &cwd)
            .ok_or_else(|| ConfigError::NotFound(cli.config.clone()))?;

        Self::load_from(&config_path, &cli.command)
    }

    /// Load a known config file, applying the command's path overrides.
    pub fn load_from(config_path: &Path, command: &Commands) -> Result<Self> {
        let mut config = Self::from_path(config_path)?;

        config.config_path = normalize_path(config_path);
        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "config file `{}` has no parent directory",
                    config_path.display()
                ))
            })?;

        config.apply_overrides(command);
        config.normalize_paths(&root);
        config.validate()?;

        debug!("config"; "loaded {}", config.config_path.display());
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    // ========================================================================
    // paths
    // ========================================================================

    fn apply_overrides(&mut self, command: &Commands) {
        match command {
            Commands::Digest {
                build_dir: Some(dir),
            } => self.options.build_dir = dir.clone(),
            Commands::Watch {
                watch_file: Some(file),
            } => self.options.watch_file = file.clone(),
            _ => {}
        }
    }

    fn normalize_paths(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.options.normalize(&root);
        self.root = root;
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Bundles in declaration order.
    pub fn bundles(&self) -> Vec<Bundle> {
        section::bundles::collect(&self.raw_bundles)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Collects every problem before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let diag = self.diagnose();
        diag.print_warnings();
        diag.into_result().map_err(ConfigError::Diagnostics)
    }

    fn diagnose(&self) -> ConfigDiagnostics {
        let mut diag = ConfigDiagnostics::new();
        let options = &self.options;

        if !options.assets_dir.is_dir() {
            diag.error_with_hint(
                "options.assets_dir",
                format!(
                    "asset directory `{}` not found",
                    self.root_relative(&options.assets_dir).display()
                ),
                "create it or point options.assets_dir at an existing directory",
            );
        }

        for dir in &options.library_dirs {
            if !dir.is_dir() {
                debug!("config"; "library dir {} missing, skipped until it appears", dir.display());
            }
        }

        if options.watch_file.starts_with(&options.assets_dir) {
            diag.warn(
                "options.watch_file",
                "handoff file inside assets_dir is indexed as an asset after the next rescan",
            );
        }

        if self.watch.debounce_ms == 0 {
            diag.error_with_hint(
                "watch.debounce_ms",
                "debounce interval must be greater than 0",
                "150 works well for most editors",
            );
        }

        section::bundles::validate(&self.raw_bundles, &mut diag);
        diag
    }
}

/// Parse a config snippet without normalization or validation.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> HumptyConfig {
    HumptyConfig::from_str(content).unwrap()
}
