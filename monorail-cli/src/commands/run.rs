//! Run command handlers
//!
//! Handles listing a pipeline's runs and inspecting a single run.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use monorail_client::OrchestratorClient;
use monorail_core::domain::run::{PipelineRun, StageOutcome};
use monorail_core::dto::run::RunSummary;

use super::colorize_status;
use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::IdOrPrefix;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// List the runs of a pipeline
    List {
        /// Project name
        project: String,
    },
    /// Get run details
    Get {
        /// Run ID, or an unambiguous prefix when --project is given
        id: String,

        /// Project whose runs the prefix is resolved against
        #[arg(short = 'P', long)]
        project: Option<String>,

        /// Print the raw run record as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle run commands
pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        RunCommands::List { project } => list_runs(&client, &project).await,
        RunCommands::Get { id, project, json } => {
            get_run(&client, &id, project.as_deref(), json).await
        }
    }
}

/// List runs of a pipeline
async fn list_runs(client: &OrchestratorClient, project: &str) -> Result<()> {
    let runs = client.list_runs(project).await?;

    if runs.is_empty() {
        println!(
            "{}",
            format!("No runs found for pipeline {}.", project).yellow()
        );
    } else {
        println!(
            "{}",
            format!("Found {} run(s) for pipeline {}:", runs.len(), project).bold()
        );
        println!();
        for run in runs {
            print_run_summary(&run);
        }
    }

    Ok(())
}

/// Get and display a single run
async fn get_run(
    client: &OrchestratorClient,
    id: &str,
    project: Option<&str>,
    json: bool,
) -> Result<()> {
    let id_or_prefix = IdOrPrefix::parse(id);
    let uuid = match (id_or_prefix.as_uuid(), project) {
        (Some(uuid), _) => uuid,
        (None, Some(project)) => resolve_run_id(client, project, &id_or_prefix).await?,
        (None, None) => anyhow::bail!(
            "'{}' is not a full run ID; pass --project to resolve a prefix",
            id
        ),
    };

    let run = client.get_run(uuid).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run_details(&run);
    }

    Ok(())
}

/// Print a run summary
fn print_run_summary(run: &RunSummary) {
    println!("  {} Run {}", "▸".cyan(), run.id.to_string().dimmed());
    println!("    Status: {}", colorize_status(&run.status));
    println!(
        "    Queued: {}",
        run.queued_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(failure) = &run.failure {
        println!(
            "    Failed: {}",
            format!("{}/{}: {}", failure.stage, failure.action, failure.error).red()
        );
    }
    println!();
}

/// Print detailed run information
fn print_run_details(run: &PipelineRun) {
    println!("{}", "Run Details:".bold());
    println!("  ID:       {}", run.id.to_string().cyan());
    println!("  Pipeline: {}", run.project_name.bold());
    println!("  Status:   {}", colorize_status(&run.status));
    println!("  State:    {}", run.state);
    println!("  Branch:   {}", run.event.branch);
    println!(
        "  Queued:   {}",
        run.queued_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(started) = run.started_at {
        println!("  Started:  {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(finished) = run.finished_at {
        println!("  Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = run.started_at {
            let duration = finished.signed_duration_since(started);
            println!("  Duration: {}ms", duration.num_milliseconds());
        }
    }

    println!("\n{}", "Changed paths:".bold());
    for path in &run.event.changed_paths {
        println!("  {}", path.dimmed());
    }

    if !run.stages.is_empty() {
        println!("\n{}", "Stages:".bold());
        for record in &run.stages {
            let outcome = match record.outcome {
                Some(StageOutcome::Succeeded) => "✓".green(),
                Some(StageOutcome::Failed) => "✗".red(),
                None => "…".yellow(),
            };
            println!(
                "  {} {}. {}/{}",
                outcome, record.run_order, record.stage, record.action
            );
        }
    }

    if !run.artifacts.is_empty() {
        println!("\n{}", "Artifacts:".bold());
        for artifact in &run.artifacts {
            println!(
                "  {} {}/{} ({} bytes)",
                artifact.slot.as_str().cyan(),
                artifact.location,
                artifact.key,
                artifact.size_bytes
            );
        }
    }

    if let Some(change_set) = &run.change_set {
        println!("\n{}", "Change set:".bold());
        println!("  ID:    {}", change_set.id);
        println!("  Name:  {}", change_set.change_set_name);
        println!("  Stack: {}", change_set.stack_name);
    }

    if let Some(failure) = &run.failure {
        println!("\n{}", "Error:".bold());
        println!("  {}/{}", failure.stage, failure.action);
        println!("  {}", failure.error.red());
    }
}
