//! Health Check API Handler

use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::service::Orchestrator;

/// GET /health
/// Reports liveness and how many pipelines are defined
pub async fn health_check(State(orchestrator): State<Arc<Orchestrator>>) -> Json<Value> {
    let pipelines = orchestrator.pipelines().await.len();

    Json(json!({ "status": "ok", "pipelines": pipelines }))
}
