//! Monorail Orchestrator
//!
//! Continuous delivery orchestrator for monorepos: one independent pipeline
//! per sub-project, each triggered only by changes under its own directory.
//!
//! Architecture:
//! - Collaborators: traits for the source connection, build runner, artifact
//!   store, deploy service and identity system, with in-memory backends
//! - Services: pipeline factory, sequencer, registry and run history
//! - Scheduler: per-pipeline run queues and the change event dispatcher
//! - API: axum HTTP endpoints over the orchestrator

pub mod api;
pub mod collaborator;
pub mod config;
pub mod scheduler;
pub mod service;
