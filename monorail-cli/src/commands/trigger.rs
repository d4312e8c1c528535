//! Trigger command handlers
//!
//! `check` asks the orchestrator how a defined pipeline would react to a
//! change. `local` evaluates the project filter convention without a server.

use anyhow::Result;
use clap::Subcommand;
use monorail_core::domain::spec::validate_project_name;
use monorail_core::domain::trigger::TriggerFilter;
use monorail_core::trigger;

use super::{change_event, print_decision};
use crate::config::Config;

/// Trigger subcommands
#[derive(Subcommand)]
pub enum TriggerCommands {
    /// Evaluate a change against a defined pipeline
    Check {
        /// Project name
        #[arg(short = 'P', long)]
        project: String,

        /// Branch the change landed on
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Changed repository paths (comma-separated or repeated)
        #[arg(short, long = "path", value_delimiter = ',', required = true)]
        paths: Vec<String>,
    },
    /// Evaluate a change against project filters locally
    Local {
        /// Project names (comma-separated or repeated)
        #[arg(short = 'P', long = "project", value_delimiter = ',', required = true)]
        projects: Vec<String>,

        /// Branch the pipelines track
        #[arg(long, default_value = "main")]
        tracked_branch: String,

        /// Branch the change landed on
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Changed repository paths (comma-separated or repeated)
        #[arg(short, long = "path", value_delimiter = ',', required = true)]
        paths: Vec<String>,
    },
}

/// Handle trigger commands
pub async fn handle_trigger_command(command: TriggerCommands, config: &Config) -> Result<()> {
    match command {
        TriggerCommands::Check {
            project,
            branch,
            paths,
        } => {
            let decision = config
                .client()
                .check_trigger(&project, change_event(branch, paths))
                .await?;
            print_decision(&project, &decision);
            Ok(())
        }
        TriggerCommands::Local {
            projects,
            tracked_branch,
            branch,
            paths,
        } => {
            let event = change_event(branch, paths);
            for project in &projects {
                validate_project_name(project)?;
                let filter = TriggerFilter::for_project(project, &tracked_branch);
                print_decision(project, &trigger::evaluate(&event, &filter));
            }
            Ok(())
        }
    }
}
