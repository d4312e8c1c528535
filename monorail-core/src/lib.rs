//! Monorail Core
//!
//! Core types and pure logic for the Monorail monorepo delivery orchestrator.
//!
//! This crate contains:
//! - Domain types: pipeline specs, stages, artifacts, change sets, runs, grants
//! - DTOs: Data transfer objects for the orchestrator HTTP API
//! - Trigger filter engine: decides whether a change event fires a pipeline
//! - Permission policy builder: derives the grants of a pipeline's execution identity
//! - Build stage definition: the isolated build environment of one project

pub mod build;
pub mod domain;
pub mod dto;
pub mod error;
pub mod policy;
pub mod trigger;

pub use error::{CollaboratorError, PipelineError, Result};
