//! Run API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use monorail_core::domain::run::PipelineRun;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::Orchestrator;

/// GET /run/{id}
/// Get a run with its stage records, artifacts and change set
pub async fn get_run(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::debug!("Getting run: {}", id);

    let run = orchestrator.run(id).await?;

    Ok(Json(run))
}
