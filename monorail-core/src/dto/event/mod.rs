//! Change event DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::trigger::ChangeEvent;

/// A run queued by an accepted change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRun {
    pub project_name: String,
    pub run_id: Uuid,
}

/// A pipeline that accepted a change event but could not queue a run for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRun {
    pub project_name: String,
    pub reason: String,
}

/// Result of dispatching a change event to every defined pipeline
///
/// Pipelines whose filter rejected the event are not listed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchResult {
    pub queued: Vec<QueuedRun>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRun>,
}

/// Request to evaluate an event against one pipeline's filter without running it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerCheck {
    pub project_name: String,
    pub event: ChangeEvent,
}
