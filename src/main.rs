//! wp2typecho - migrate a WordPress blog into a Typecho installation.

#![allow(dead_code)]

mod cli;
mod config;
mod entity;
mod logger;
mod markdown;
mod media;
mod migrate;
mod store;
mod utils;
mod wxr;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::MigrateConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match &cli.command {
        Commands::Migrate { dry_run } => {
            let config = MigrateConfig::load(&cli.config)?;
            cli::migrate::run_migrate(config, *dry_run)
        }
        Commands::Convert { dry_run, preview } => {
            let config = MigrateConfig::load(&cli.config)?;
            cli::convert::run_convert(&config, *dry_run, *preview)
        }
        Commands::Import {
            wxr_file,
            output,
            prefix,
        } => cli::import_wxr::run_import(wxr_file, output, prefix),
    }
}
