//! Monorail CLI
//!
//! Defines project pipelines, sends monorepo change events and follows the
//! runs they queue. `trigger local` evaluates the project path convention
//! without contacting the orchestrator.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

const LONG_ABOUT: &str = "\
Drive Monorail delivery pipelines from the command line.

Each project under `projects/<name>/` of the monorepo gets its own pipeline.
A change event fires every pipeline whose project directory it touches; the
runs it queues can then be listed and inspected by ID or ID prefix.";

#[derive(Parser)]
#[command(name = "monorail")]
#[command(about = "Define project pipelines, send change events and inspect runs")]
#[command(long_about = LONG_ABOUT)]
struct Cli {
    /// Base URL of the orchestrator HTTP API
    #[arg(
        long,
        env = "MONORAIL_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
    };

    handle_command(cli.command, &config).await
}
