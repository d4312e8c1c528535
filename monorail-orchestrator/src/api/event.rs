//! Change Event API Handlers

use axum::{Json, extract::State};
use monorail_core::domain::trigger::{ChangeEvent, TriggerDecision};
use monorail_core::dto::event::{DispatchResult, TriggerCheck};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::service::Orchestrator;

/// POST /event
/// Dispatch a change event to every pipeline it triggers
pub async fn dispatch_event(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(event): Json<ChangeEvent>,
) -> ApiResult<Json<DispatchResult>> {
    tracing::info!(
        "Received change event on {} ({} paths)",
        event.branch,
        event.changed_paths.len()
    );

    Ok(Json(orchestrator.dispatch(event).await))
}

/// POST /event/check
/// Evaluate a change event against one pipeline without running it
pub async fn check_trigger(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<TriggerCheck>,
) -> ApiResult<Json<TriggerDecision>> {
    let decision = orchestrator
        .check_trigger(&req.project_name, &req.event)
        .await?;

    Ok(Json(decision))
}
