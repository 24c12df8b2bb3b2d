//! Humpty - Digest manifests and watch-mode rebuilds for web assets.

#![allow(dead_code)]

mod asset;
mod cli;
mod config;
mod core;
mod digest;
mod logger;
mod pipeline;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::HumptyConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = HumptyConfig::load(&cli)?;

    match &cli.command {
        Commands::Digest { .. } => cli::digest::run_digest(&config)?,
        Commands::Watch { .. } => cli::watch::run_watch(&config)?,
        Commands::Resolve { paths } => cli::resolve::run_resolve(paths, &config)?,
    }

    if core::is_interrupted() {
        std::process::exit(core::INTERRUPTED);
    }
    Ok(())
}
