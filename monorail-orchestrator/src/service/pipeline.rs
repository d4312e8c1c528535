//! Pipeline
//!
//! A fully wired pipeline for one project: its resolved resources, stage graph,
//! trigger filter and execution identity. Built once by the factory and never
//! mutated afterwards, apart from the lazily narrowed compute-function scope.

use monorail_core::build::BuildStageDefinition;
use monorail_core::domain::artifact::{ArtifactLocationHandle, ArtifactSlot};
use monorail_core::domain::change_set::{CHANGE_SET_NAME, TEMPLATE_PATH};
use monorail_core::domain::identity::{ConnectionHandle, IdentityHandle};
use monorail_core::domain::permission::{PermissionGrant, ResourceScope};
use monorail_core::domain::spec::PipelineSpec;
use monorail_core::domain::stage::{
    ActionKind, BUILD_RUN_ORDER, DEPLOY_APPLY_RUN_ORDER, DEPLOY_PLAN_RUN_ORDER, SOURCE_RUN_ORDER,
    Stage, StageAction, validate_stages,
};
use monorail_core::domain::trigger::{ChangeEvent, TriggerDecision, TriggerFilter};
use monorail_core::dto::pipeline::{PipelineDetail, PipelineSummary};
use monorail_core::{Result, policy, trigger};

pub const SOURCE_STAGE: &str = "Source";
pub const BUILD_STAGE: &str = "Build";
pub const DEPLOY_STAGE: &str = "Deploy";

pub const SOURCE_ACTION: &str = "Source";
pub const BUILD_ACTION: &str = "Build";
pub const DEPLOY_PLAN_ACTION: &str = "create-deploy";
pub const DEPLOY_APPLY_ACTION: &str = "execute-deploy";

/// An immutable, fully wired pipeline
#[derive(Debug)]
pub struct Pipeline {
    pub(crate) spec: PipelineSpec,
    pub(crate) location: ArtifactLocationHandle,
    pub(crate) connection: ConnectionHandle,
    pub(crate) identity: IdentityHandle,
    pub(crate) build: BuildStageDefinition,
    pub(crate) trigger: TriggerFilter,
    pub(crate) stages: Vec<Stage>,
    pub(crate) function_scope: ResourceScope,
}

impl Pipeline {
    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    pub fn project_name(&self) -> &str {
        &self.spec.project_name
    }

    pub fn name(&self) -> String {
        self.spec.pipeline_name()
    }

    pub fn location(&self) -> &ArtifactLocationHandle {
        &self.location
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn identity(&self) -> &IdentityHandle {
        &self.identity
    }

    pub fn build(&self) -> &BuildStageDefinition {
        &self.build
    }

    pub fn trigger(&self) -> &TriggerFilter {
        &self.trigger
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn function_scope(&self) -> &ResourceScope {
        &self.function_scope
    }

    /// Every action with its stage, in run order
    pub fn actions(&self) -> impl Iterator<Item = (&Stage, &StageAction)> {
        self.stages
            .iter()
            .flat_map(|stage| stage.actions.iter().map(move |action| (stage, action)))
    }

    /// Grants of the execution identity at the current function scope
    pub fn current_grants(&self) -> Vec<PermissionGrant> {
        policy::build_with_scope(&self.location, &self.connection, &self.function_scope)
    }

    pub fn should_fire(&self, event: &ChangeEvent) -> bool {
        trigger::should_fire(event, &self.trigger)
    }

    pub fn evaluate(&self, event: &ChangeEvent) -> TriggerDecision {
        trigger::evaluate(event, &self.trigger)
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            project_name: self.spec.project_name.clone(),
            pipeline_name: self.name(),
            repository: self.spec.repository.clone(),
            branch: self.spec.branch.clone(),
            artifact_location: self.location.name.clone(),
        }
    }

    pub fn detail(&self) -> PipelineDetail {
        PipelineDetail {
            summary: self.summary(),
            identity: self.identity.clone(),
            build: self.build.clone(),
            trigger: self.trigger.clone(),
            stages: self.stages.clone(),
            grants: self.current_grants(),
        }
    }
}

/// Assembles and validates the stage graph of a project
///
/// `Source -> Build -> Deploy(create-deploy, execute-deploy)`, handing
/// `sourceOutput` to Build and `buildOutput` to the deploy plan.
pub fn assemble_stages(spec: &PipelineSpec, build: &BuildStageDefinition) -> Result<Vec<Stage>> {
    let (owner, repo) = spec.repository_parts()?;

    let stages = vec![
        Stage {
            name: SOURCE_STAGE.to_string(),
            actions: vec![StageAction {
                name: SOURCE_ACTION.to_string(),
                run_order: SOURCE_RUN_ORDER,
                kind: ActionKind::SourceFetch {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    branch: spec.branch.clone(),
                },
                input_artifact: None,
                output_artifacts: vec![ArtifactSlot::SourceOutput],
            }],
        },
        Stage {
            name: BUILD_STAGE.to_string(),
            actions: vec![StageAction {
                name: BUILD_ACTION.to_string(),
                run_order: BUILD_RUN_ORDER,
                kind: ActionKind::Build {
                    build_project_name: build.build_project_name.clone(),
                },
                input_artifact: Some(ArtifactSlot::SourceOutput),
                output_artifacts: vec![ArtifactSlot::BuildOutput],
            }],
        },
        Stage {
            name: DEPLOY_STAGE.to_string(),
            actions: vec![
                StageAction {
                    name: DEPLOY_PLAN_ACTION.to_string(),
                    run_order: DEPLOY_PLAN_RUN_ORDER,
                    kind: ActionKind::ChangeSetPlan {
                        stack_name: spec.stack_name().to_string(),
                        change_set_name: CHANGE_SET_NAME.to_string(),
                        template_path: TEMPLATE_PATH.to_string(),
                    },
                    input_artifact: Some(ArtifactSlot::BuildOutput),
                    output_artifacts: Vec::new(),
                },
                StageAction {
                    name: DEPLOY_APPLY_ACTION.to_string(),
                    run_order: DEPLOY_APPLY_RUN_ORDER,
                    kind: ActionKind::ChangeSetApply {
                        stack_name: spec.stack_name().to_string(),
                        change_set_name: CHANGE_SET_NAME.to_string(),
                    },
                    input_artifact: None,
                    output_artifacts: Vec::new(),
                },
            ],
        },
    ];

    validate_stages(&stages)?;
    Ok(stages)
}
