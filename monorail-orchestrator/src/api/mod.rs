//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod event;
pub mod health;
pub mod pipeline;
pub mod run;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::Orchestrator;

/// Create the main API router with all endpoints
pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/pipeline/create", post(pipeline::create_pipeline))
        .route("/pipeline/list", get(pipeline::list_pipelines))
        .route("/pipeline/{project}", get(pipeline::get_pipeline))
        .route("/pipeline/{project}/runs", get(pipeline::list_runs))
        // Event endpoints
        .route("/event", post(event::dispatch_event))
        .route("/event/check", post(event::check_trigger))
        // Run endpoints
        .route("/run/{id}", get(run::get_run))
        // Add state and middleware
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
}
