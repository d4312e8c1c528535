//! Stage and stage action domain types
//!
//! A pipeline is an ordered list of stages, each holding one or more actions.
//! Actions are sequenced by `run_order`, which is strictly increasing across the
//! whole pipeline; artifacts flow from producer to consumer along that order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::artifact::ArtifactSlot;
use super::run::RunState;
use crate::error::{PipelineError, Result};

pub const SOURCE_RUN_ORDER: u32 = 1;
pub const BUILD_RUN_ORDER: u32 = 2;
pub const DEPLOY_PLAN_RUN_ORDER: u32 = 3;
pub const DEPLOY_APPLY_RUN_ORDER: u32 = 4;

/// What an action does, with the parameters its collaborator needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    SourceFetch {
        owner: String,
        repo: String,
        branch: String,
    },
    Build {
        build_project_name: String,
    },
    ChangeSetPlan {
        stack_name: String,
        change_set_name: String,
        template_path: String,
    },
    ChangeSetApply {
        stack_name: String,
        change_set_name: String,
    },
}

impl ActionKind {
    /// State of the run state machine while this action executes
    pub fn state(&self) -> RunState {
        match self {
            ActionKind::SourceFetch { .. } => RunState::SourceFetching,
            ActionKind::Build { .. } => RunState::Building,
            ActionKind::ChangeSetPlan { .. } => RunState::DeployPlanning,
            ActionKind::ChangeSetApply { .. } => RunState::DeployApplying,
        }
    }
}

/// One unit of work within a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageAction {
    pub name: String,
    pub run_order: u32,
    pub kind: ActionKind,
    pub input_artifact: Option<ArtifactSlot>,
    pub output_artifacts: Vec<ArtifactSlot>,
}

/// A named group of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<StageAction>,
}

/// Validates the stage graph of a pipeline
///
/// Checks that action names are unique within their stage, run orders are
/// positive and strictly increasing in declaration order, and every artifact
/// slot has exactly one producer and at least one consumer running after it.
pub fn validate_stages(stages: &[Stage]) -> Result<()> {
    if stages.is_empty() {
        return Err(PipelineError::Configuration(
            "pipeline must have at least one stage".to_string(),
        ));
    }

    let mut last_run_order = 0;
    let mut producers: HashMap<ArtifactSlot, u32> = HashMap::new();
    let mut consumers: Vec<(ArtifactSlot, u32, &str)> = Vec::new();

    for stage in stages {
        if stage.actions.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "stage '{}' has no actions",
                stage.name
            )));
        }

        let mut names = HashSet::new();
        for action in &stage.actions {
            if !names.insert(action.name.as_str()) {
                return Err(PipelineError::Configuration(format!(
                    "duplicate action '{}' in stage '{}'",
                    action.name, stage.name
                )));
            }

            if action.run_order <= last_run_order {
                return Err(PipelineError::Configuration(format!(
                    "action '{}' has run order {} but must be greater than {}",
                    action.name, action.run_order, last_run_order
                )));
            }
            last_run_order = action.run_order;

            for slot in &action.output_artifacts {
                if producers.insert(*slot, action.run_order).is_some() {
                    return Err(PipelineError::Configuration(format!(
                        "artifact '{}' has more than one producer",
                        slot
                    )));
                }
            }

            if let Some(slot) = action.input_artifact {
                consumers.push((slot, action.run_order, action.name.as_str()));
            }
        }
    }

    for (slot, run_order, name) in &consumers {
        match producers.get(slot) {
            Some(produced_at) if produced_at < run_order => {}
            Some(_) => {
                return Err(PipelineError::Configuration(format!(
                    "action '{}' consumes '{}' before it is produced",
                    name, slot
                )));
            }
            None => {
                return Err(PipelineError::Configuration(format!(
                    "action '{}' consumes '{}' which no action produces",
                    name, slot
                )));
            }
        }
    }

    for slot in producers.keys() {
        if !consumers.iter().any(|(consumed, _, _)| consumed == slot) {
            return Err(PipelineError::Configuration(format!(
                "artifact '{}' is produced but never consumed",
                slot
            )));
        }
    }

    Ok(())
}
