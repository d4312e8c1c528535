//! Change event command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use super::change_event;
use crate::config::Config;

/// Event subcommands
#[derive(Subcommand)]
pub enum EventCommands {
    /// Send a change event to every pipeline
    Send {
        /// Branch the change landed on
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Changed repository paths (comma-separated or repeated)
        #[arg(short, long = "path", value_delimiter = ',', required = true)]
        paths: Vec<String>,
    },
}

/// Handle event commands
pub async fn handle_event_command(command: EventCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        EventCommands::Send { branch, paths } => {
            let event = change_event(branch, paths);
            let result = client.send_event(&event).await?;

            if result.queued.is_empty() && result.skipped.is_empty() {
                println!("{}", "No pipeline triggered by this change.".yellow());
                return Ok(());
            }

            if !result.queued.is_empty() {
                println!(
                    "{}",
                    format!("✓ Queued {} run(s):", result.queued.len())
                        .green()
                        .bold()
                );
                for queued in result.queued {
                    println!(
                        "  {} {} {}",
                        "▸".cyan(),
                        queued.project_name.bold(),
                        queued.run_id.to_string().dimmed()
                    );
                }
            }

            if !result.skipped.is_empty() {
                println!(
                    "{}",
                    format!("✗ Skipped {} pipeline(s):", result.skipped.len())
                        .red()
                        .bold()
                );
                for skipped in result.skipped {
                    println!(
                        "  {} {} {}",
                        "▸".cyan(),
                        skipped.project_name.bold(),
                        skipped.reason.red()
                    );
                }
            }

            Ok(())
        }
    }
}
