//! Core domain types
//!
//! This module contains the structures shared by the orchestrator (which wires
//! and runs pipelines) and the client/CLI (which display them).

pub mod artifact;
pub mod change_set;
pub mod identity;
pub mod permission;
pub mod run;
pub mod spec;
pub mod stage;
pub mod trigger;
