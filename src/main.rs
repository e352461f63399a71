//! assetgraph - load a website into an asset graph and inspect it.

mod cli;
mod config;

use std::process::ExitCode;

use anyhow::{Context, Result};
use assetgraph::log;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

/// Exit code for configuration and structural failures.
const FATAL: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            log!("error"; "{:#}", err);
            ExitCode::from(FATAL)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = SiteConfig::load(cli)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async {
        match &cli.command {
            Commands::Check { .. } => cli::check::run_check(&config).await,
            Commands::Dump { .. } => cli::dump::run_dump(&config).await,
        }
    })
}
