//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline definition and inspection.

use axum::{
    Json,
    extract::{Path, State},
};
use monorail_core::dto::pipeline::{PipelineDetail, PipelineRecord, PipelineSummary};
use monorail_core::dto::run::RunSummary;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::service::Orchestrator;

/// POST /pipeline/create
/// Define a pipeline for a project
pub async fn create_pipeline(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<PipelineRecord>,
) -> ApiResult<Json<PipelineDetail>> {
    tracing::info!("Creating pipeline: {}", req.project_name);

    let pipeline = orchestrator.define_pipeline(req).await?;

    Ok(Json(pipeline.detail()))
}

/// GET /pipeline/list
/// List all pipelines
pub async fn list_pipelines(
    State(orchestrator): State<Arc<Orchestrator>>,
) -> ApiResult<Json<Vec<PipelineSummary>>> {
    tracing::debug!("Listing all pipelines");

    let pipelines = orchestrator.pipelines().await;

    Ok(Json(pipelines.iter().map(|p| p.summary()).collect()))
}

/// GET /pipeline/{project}
/// Get a pipeline's stages, trigger filter and grants
pub async fn get_pipeline(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(project): Path<String>,
) -> ApiResult<Json<PipelineDetail>> {
    tracing::debug!("Getting pipeline: {}", project);

    let pipeline = orchestrator.pipeline(&project).await?;

    Ok(Json(pipeline.detail()))
}

/// GET /pipeline/{project}/runs
/// List the runs of a pipeline
pub async fn list_runs(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(project): Path<String>,
) -> ApiResult<Json<Vec<RunSummary>>> {
    tracing::debug!("Listing runs for pipeline: {}", project);

    let runs = orchestrator.runs(&project).await?;

    Ok(Json(runs.into_iter().map(RunSummary::from).collect()))
}
