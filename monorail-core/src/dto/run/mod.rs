//! Run DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::run::{PipelineRun, RunFailure, RunState, RunStatus};

/// Run summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub project_name: String,
    pub status: RunStatus,
    pub state: RunState,
    pub failure: Option<RunFailure>,
    pub queued_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<PipelineRun> for RunSummary {
    fn from(run: PipelineRun) -> Self {
        Self {
            id: run.id,
            project_name: run.project_name,
            status: run.status,
            state: run.state,
            failure: run.failure,
            queued_at: run.queued_at,
            finished_at: run.finished_at,
        }
    }
}
