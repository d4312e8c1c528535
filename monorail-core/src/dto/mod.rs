//! Data Transfer Objects for the orchestrator API
//!
//! This module contains DTOs exchanged between the orchestrator and its
//! clients (CLI, webhook relays). DTOs are lightweight representations of
//! domain entities optimized for network transfer.

pub mod event;
pub mod pipeline;
pub mod run;
