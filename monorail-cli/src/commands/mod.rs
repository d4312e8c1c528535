//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod event;
mod pipeline;
mod run;
mod trigger;

pub use event::EventCommands;
pub use pipeline::PipelineCommands;
pub use run::RunCommands;
pub use trigger::TriggerCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use monorail_core::domain::run::RunStatus;
use monorail_core::domain::trigger::{ChangeEvent, TriggerDecision};

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline definition and inspection
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Change event dispatch
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Run inspection
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Trigger filter evaluation
    Trigger {
        #[command(subcommand)]
        command: TriggerCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Event { command } => event::handle_event_command(command, config).await,
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Trigger { command } => trigger::handle_trigger_command(command, config).await,
    }
}

/// Build a change event from command-line arguments
fn change_event(branch: String, paths: Vec<String>) -> ChangeEvent {
    ChangeEvent {
        branch,
        changed_paths: paths,
    }
}

/// Colorize run status for display
fn colorize_status(status: &RunStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        RunStatus::Queued => status_str.yellow(),
        RunStatus::Running => status_str.cyan(),
        RunStatus::Succeeded => status_str.green(),
        RunStatus::Failed => status_str.red(),
    }
}

/// Print the outcome of a trigger evaluation
fn print_decision(project_name: &str, decision: &TriggerDecision) {
    match decision {
        TriggerDecision::Fire { matched_paths } => {
            println!(
                "{} {} {}",
                "✓".green().bold(),
                project_name.bold(),
                "would fire".green()
            );
            for path in matched_paths {
                println!("    {}", path.dimmed());
            }
        }
        TriggerDecision::Mismatch { reason } => {
            println!(
                "{} {} {} ({})",
                "✗".yellow().bold(),
                project_name.bold(),
                "would not fire".yellow(),
                reason.to_string().dimmed()
            );
        }
    }
}
