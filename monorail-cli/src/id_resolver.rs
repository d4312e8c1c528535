//! ID resolver module
//!
//! Resolves run ID prefixes to full UUIDs by listing a pipeline's runs, so
//! users can type short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use monorail_client::OrchestratorClient;
use monorail_core::dto::run::RunSummary;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a run ID or prefix within a project's pipeline
///
/// If the input is already a full UUID, returns it immediately.
///
/// # Errors
/// Returns an error if:
/// - No run of the pipeline matches the prefix
/// - Multiple runs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_run_id(
    client: &OrchestratorClient,
    project_name: &str,
    id_or_prefix: &IdOrPrefix,
) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let runs = client
        .list_runs(project_name)
        .await
        .context("Failed to fetch runs for ID resolution")?;

    pick_run(&runs, project_name, id_or_prefix)
}

fn pick_run(runs: &[RunSummary], project_name: &str, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    let matches: Vec<_> = runs.iter().filter(|r| id_or_prefix.matches(&r.id)).collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No run found with ID starting with '{}' in pipeline {}",
            id_or_prefix,
            project_name
        )),
        [run] => Ok(run.id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|r| r.id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple runs in pipeline {}: {}",
                id_or_prefix,
                project_name,
                ids.join(", ")
            ))
        }
    }
}
