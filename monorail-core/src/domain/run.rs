//! Pipeline run domain types
//!
//! A run walks the state machine
//! `Idle -> SourceFetching -> Building -> DeployPlanning -> DeployApplying -> Idle`,
//! dropping to `Failed` on the first stage error. `Failed` is terminal for the
//! run; the next accepted event starts a new run from `Idle`.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact::Artifact;
use super::change_set::ChangeSet;
use super::trigger::ChangeEvent;
use crate::error::{PipelineError, Result};

/// State of a pipeline's run state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    SourceFetching,
    Building,
    DeployPlanning,
    DeployApplying,
    Failed,
}

impl RunState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;

        matches!(
            (self, next),
            (Idle, SourceFetching)
                | (SourceFetching, Building)
                | (Building, DeployPlanning)
                | (DeployPlanning, DeployApplying)
                | (DeployApplying, Idle)
                | (SourceFetching | Building | DeployPlanning | DeployApplying, Failed)
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "Idle"),
            RunState::SourceFetching => write!(f, "SourceFetching"),
            RunState::Building => write!(f, "Building"),
            RunState::DeployPlanning => write!(f, "DeployPlanning"),
            RunState::DeployApplying => write!(f, "DeployApplying"),
            RunState::Failed => write!(f, "Failed"),
        }
    }
}

/// Lifecycle status of a run record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Accepted and waiting behind the pipeline's active run
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Queued => write!(f, "Queued"),
            RunStatus::Running => write!(f, "Running"),
            RunStatus::Succeeded => write!(f, "Succeeded"),
            RunStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageOutcome {
    Succeeded,
    Failed,
}

/// Execution record of one stage action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: String,
    pub action: String,
    pub run_order: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<StageOutcome>,
}

/// Failing stage and the underlying collaborator error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub stage: String,
    pub action: String,
    pub error: String,
}

/// One execution of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub project_name: String,
    pub event: ChangeEvent,
    pub status: RunStatus,
    pub state: RunState,
    pub stages: Vec<StageRecord>,
    pub artifacts: Vec<Artifact>,
    pub change_set: Option<ChangeSet>,
    pub failure: Option<RunFailure>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Creates the record of an accepted, not yet started run
    pub fn queued(id: Uuid, project_name: impl Into<String>, event: ChangeEvent) -> Self {
        Self {
            id,
            project_name: project_name.into(),
            event,
            status: RunStatus::Queued,
            state: RunState::Idle,
            stages: Vec::new(),
            artifacts: Vec::new(),
            change_set: None,
            failure: None,
            queued_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Moves the state machine, rejecting transitions it does not allow
    pub fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::Configuration(format!(
                "invalid run state transition {} -> {}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Opens a new action record, never starting before the previous one completed
    pub fn begin_action(&mut self, stage: &str, action: &str, run_order: u32) {
        let now = Utc::now();
        let started_at = match self.stages.last().and_then(|r| r.completed_at) {
            Some(previous) if previous > now => previous,
            _ => now,
        };

        self.stages.push(StageRecord {
            stage: stage.to_string(),
            action: action.to_string(),
            run_order,
            started_at,
            completed_at: None,
            outcome: None,
        });
    }

    /// Closes the most recently started action
    ///
    /// Completion times are strictly increasing across a run's actions.
    pub fn finish_action(&mut self, outcome: StageOutcome) {
        let previous = self
            .stages
            .iter()
            .rev()
            .nth(1)
            .and_then(|r| r.completed_at);

        if let Some(record) = self.stages.last_mut() {
            let now = Utc::now();
            let completed_at = match previous {
                Some(previous) if previous >= now => previous + TimeDelta::nanoseconds(1),
                _ => now,
            };
            record.completed_at = Some(completed_at);
            record.outcome = Some(outcome);
        }
    }

    /// Marks a run that reached the end of its last stage
    pub fn succeed(&mut self) -> Result<()> {
        self.transition(RunState::Idle)?;
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Marks the run failed at `stage`/`action`
    pub fn fail(&mut self, stage: &str, action: &str, error: &PipelineError) {
        self.state = RunState::Failed;
        self.status = RunStatus::Failed;
        self.failure = Some(RunFailure {
            stage: stage.to_string(),
            action: action.to_string(),
            error: error.to_string(),
        });
        self.finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded | RunStatus::Failed)
    }
}
