//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Humpty asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: humpty.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = "humpty.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print debug output
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build digested bundles and write the manifest
    #[command(visible_alias = "d")]
    Digest {
        /// Output directory for digested files (relative to project root)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        build_dir: Option<PathBuf>,
    },

    /// Rebuild bundles on change and publish them through the handoff file
    #[command(visible_alias = "w")]
    Watch {
        /// Handoff file path (relative to project root)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        watch_file: Option<PathBuf>,
    },

    /// Print the file each partial asset path resolves to
    #[command(visible_alias = "r")]
    Resolve {
        /// Partial paths, e.g. `jquery.js` or `webjars/jquery/jquery.js`
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,
    },
}
