// src/main.rs

//! oijudge
//!
//! Entry point for the oijudge CLI.
//!
//! Responsibilities of this file:
//! - Parse CLI arguments
//! - Install the stderr log subscriber
//! - Hand off execution to the runner

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use oijudge::{cli, runner};

/// Program entry point.
///
/// Uses Tokio because judging spawns and waits on child processes
/// asynchronously.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "oijudge=debug" } else { "oijudge=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    runner::run(&cli.config, cli.command).await
}
