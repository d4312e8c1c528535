//! Pipeline command handlers
//!
//! Handles defining, listing and inspecting project pipelines.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use monorail_client::OrchestratorClient;
use monorail_core::domain::permission::{Effect, PermissionGrant};
use monorail_core::dto::pipeline::{PipelineDetail, PipelineRecord, PipelineSummary};

use crate::config::Config;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Define the pipeline of a project
    Create {
        /// Repository in owner/repo form
        #[arg(short, long)]
        repository: String,

        /// Branch the pipeline tracks
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Project directory name under projects/
        #[arg(short, long)]
        project: String,
    },
    /// List all pipelines
    List,
    /// Get pipeline details
    Get {
        /// Project name
        project: String,
    },
}

/// Handle pipeline commands
///
/// # Arguments
/// * `command` - The pipeline command to execute
/// * `config` - The CLI configuration
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        PipelineCommands::Create {
            repository,
            branch,
            project,
        } => create_pipeline(&client, repository, branch, project).await,
        PipelineCommands::List => list_pipelines(&client).await,
        PipelineCommands::Get { project } => get_pipeline(&client, &project).await,
    }
}

/// Define a new pipeline
async fn create_pipeline(
    client: &OrchestratorClient,
    repository: String,
    branch: String,
    project_name: String,
) -> Result<()> {
    let record = PipelineRecord {
        repository,
        branch,
        project_name,
    };
    let project = record.project_name.clone();

    let pipeline = client
        .create_pipeline(record)
        .await
        .with_context(|| format!("Failed to define pipeline for '{}'", project))?;

    println!("{}", "✓ Pipeline defined successfully!".green().bold());
    println!("  Name:     {}", pipeline.summary.pipeline_name.bold());
    println!("  Identity: {}", pipeline.identity.name.cyan());
    println!(
        "  Stages:   {}",
        pipeline
            .stages
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
            .dimmed()
    );

    Ok(())
}

/// List all pipelines
async fn list_pipelines(client: &OrchestratorClient) -> Result<()> {
    let pipelines = client.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} pipeline(s):", pipelines.len()).bold()
        );
        println!();
        for pipeline in pipelines {
            print_pipeline_summary(&pipeline);
        }
    }

    Ok(())
}

/// Get and display a single pipeline
async fn get_pipeline(client: &OrchestratorClient, project: &str) -> Result<()> {
    let pipeline = client.get_pipeline(project).await?;

    print_pipeline_details(&pipeline);

    Ok(())
}

/// Print a pipeline summary
fn print_pipeline_summary(pipeline: &PipelineSummary) {
    println!("  {} {}", "▸".cyan(), pipeline.pipeline_name.bold());
    println!("    Project:    {}", pipeline.project_name);
    println!(
        "    Repository: {}",
        format!("{}@{}", pipeline.repository, pipeline.branch).dimmed()
    );
    println!();
}

/// Print detailed pipeline information
fn print_pipeline_details(pipeline: &PipelineDetail) {
    let summary = &pipeline.summary;

    println!("{}", "Pipeline Details:".bold());
    println!("  Name:       {}", summary.pipeline_name.bold());
    println!("  Project:    {}", summary.project_name.cyan());
    println!("  Repository: {}@{}", summary.repository, summary.branch);
    println!("  Artifacts:  {}", summary.artifact_location);
    println!("  Identity:   {}", pipeline.identity.name);

    println!("\n{}", "Build:".bold());
    println!("  Project:    {}", pipeline.build.build_project_name);
    println!("  Spec:       {}", pipeline.build.build_spec_path);
    println!("  Image:      {}", pipeline.build.image);
    println!("  Privileged: {}", pipeline.build.privileged);
    for (key, value) in &pipeline.build.environment_variables {
        println!("  {} = {}", key.cyan(), value);
    }

    println!("\n{}", "Trigger:".bold());
    for prefix in &pipeline.trigger.included_path_prefixes {
        println!("  path:   {}", prefix);
    }
    for branch in &pipeline.trigger.included_branches {
        println!("  branch: {}", branch);
    }

    println!("\n{}", "Stages:".bold());
    for stage in &pipeline.stages {
        println!("  {} {}", "▸".cyan(), stage.name.bold());
        for action in &stage.actions {
            println!(
                "    {}. {}",
                action.run_order,
                action.name.as_str().dimmed()
            );
        }
    }

    println!("\n{}", "Grants:".bold());
    for grant in &pipeline.grants {
        print_grant(grant);
    }
}

fn print_grant(grant: &PermissionGrant) {
    let effect = match grant.effect {
        Effect::Allow => "allow".green(),
        Effect::Deny => "deny".red(),
    };
    let broadened = if grant.broadened {
        " (broadened)".yellow()
    } else {
        "".normal()
    };

    println!("  {} {}{}", effect, grant.category.to_string().bold(), broadened);
    println!(
        "    actions:   {}",
        grant
            .actions
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
            .dimmed()
    );
    println!(
        "    resources: {}",
        grant
            .resources
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
            .dimmed()
    );
}
