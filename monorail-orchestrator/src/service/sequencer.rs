//! Pipeline Sequencer
//!
//! Drives one run through `Source -> Build -> Deploy-plan -> Deploy-apply`.
//! Each action checks the execution identity's grants, invokes its
//! collaborator and hands its output artifact to the store before the next
//! action starts. The first error fails the run; nothing is retried or rolled
//! back.

use chrono::Utc;
use monorail_core::domain::artifact::{Artifact, FileMap, decode_files, encode_files};
use monorail_core::domain::change_set::ChangeSet;
use monorail_core::domain::run::{PipelineRun, StageOutcome};
use monorail_core::domain::stage::{ActionKind, StageAction};
use monorail_core::policy::{
    CREATE_FUNCTION_ACTION, PASS_IDENTITY_ACTION, READ_ARTIFACT_ACTION, USE_CONNECTION_ACTION,
    identity_resource,
};
use monorail_core::{CollaboratorError, PipelineError, Result};

use super::pipeline::{DEPLOY_APPLY_ACTION, DEPLOY_STAGE, Pipeline};
use crate::collaborator::{BuildRequest, Collaborators, SourceRequest};

/// Executes pipeline runs against a set of collaborators
pub struct Sequencer {
    collaborators: Collaborators,
}

impl Sequencer {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Runs `run` to completion and returns its final record
    ///
    /// Never returns an error: a failing action is recorded on the run along
    /// with the name of its stage.
    pub async fn execute(&self, pipeline: &Pipeline, mut run: PipelineRun) -> PipelineRun {
        run.start();
        tracing::info!("Run started: {} ({})", pipeline.name(), run.id);

        for (stage, action) in pipeline.actions() {
            if let Err(err) = run.transition(action.kind.state()) {
                run.fail(&stage.name, &action.name, &err);
                return run;
            }

            run.begin_action(&stage.name, &action.name, action.run_order);
            tracing::debug!("Run {}: {} / {} started", run.id, stage.name, action.name);

            match self.run_action(pipeline, &mut run, action).await {
                Ok(()) => run.finish_action(StageOutcome::Succeeded),
                Err(err) => {
                    run.finish_action(StageOutcome::Failed);
                    tracing::warn!(
                        "Run {} failed at {} / {}: {}",
                        run.id,
                        stage.name,
                        action.name,
                        err
                    );
                    run.fail(&stage.name, &action.name, &err);
                    return run;
                }
            }
        }

        match run.succeed() {
            Ok(()) => tracing::info!("Run succeeded: {} ({})", pipeline.name(), run.id),
            Err(err) => {
                tracing::error!("Run {} could not complete: {}", run.id, err);
                run.fail(DEPLOY_STAGE, DEPLOY_APPLY_ACTION, &err);
            }
        }

        run
    }

    async fn run_action(
        &self,
        pipeline: &Pipeline,
        run: &mut PipelineRun,
        action: &StageAction,
    ) -> Result<()> {
        let stage_err = |err: CollaboratorError| PipelineError::stage(&action.name, err);

        match &action.kind {
            ActionKind::SourceFetch {
                owner,
                repo,
                branch,
            } => {
                self.authorize(
                    pipeline,
                    action,
                    USE_CONNECTION_ACTION,
                    &pipeline.connection().reference,
                )
                .await?;

                let request = SourceRequest {
                    owner: owner.clone(),
                    repo: repo.clone(),
                    branch: branch.clone(),
                };
                let files = self
                    .collaborators
                    .source
                    .fetch(pipeline.connection(), &request)
                    .await
                    .map_err(stage_err)?;

                self.store_outputs(pipeline, run, action, &files).await
            }

            ActionKind::Build { build_project_name } => {
                let input = self.load_input(pipeline, run, action).await?;
                let build = pipeline.build();

                let request = BuildRequest {
                    build_project_name: build_project_name.clone(),
                    build_spec_path: build.build_spec_path.clone(),
                    environment_variables: build.environment_variables.clone(),
                    privileged: build.privileged,
                    image: build.image.clone(),
                    input,
                };
                let output = self
                    .collaborators
                    .build
                    .run(&request)
                    .await
                    .map_err(stage_err)?;

                self.store_outputs(pipeline, run, action, &output).await
            }

            ActionKind::ChangeSetPlan {
                stack_name,
                change_set_name,
                template_path,
            } => {
                let input = self.load_input(pipeline, run, action).await?;
                self.authorize(
                    pipeline,
                    action,
                    PASS_IDENTITY_ACTION,
                    &identity_resource(pipeline.project_name()),
                )
                .await?;

                let template = input.get(template_path).ok_or_else(|| {
                    stage_err(CollaboratorError::Configuration(format!(
                        "template '{}' missing from build output",
                        template_path
                    )))
                })?;
                let template = std::str::from_utf8(template).map_err(|_| {
                    stage_err(CollaboratorError::Configuration(format!(
                        "template '{}' is not valid UTF-8",
                        template_path
                    )))
                })?;

                let id = self
                    .collaborators
                    .deploy
                    .plan(stack_name, change_set_name, template)
                    .await
                    .map_err(stage_err)?;

                tracing::debug!(
                    "Planned change set {} ({}) on {}",
                    change_set_name,
                    id,
                    stack_name
                );
                run.change_set = Some(ChangeSet {
                    id,
                    change_set_name: change_set_name.clone(),
                    stack_name: stack_name.clone(),
                    template_path: template_path.clone(),
                    created_at: Utc::now(),
                });
                Ok(())
            }

            ActionKind::ChangeSetApply {
                stack_name,
                change_set_name,
            } => {
                let resource = pipeline.function_scope().current().to_string();
                self.authorize(pipeline, action, CREATE_FUNCTION_ACTION, &resource)
                    .await?;

                let outcome = self
                    .collaborators
                    .deploy
                    .apply(stack_name, change_set_name)
                    .await
                    .map_err(stage_err)?;

                if let Some(function_id) = outcome.function_id {
                    self.narrow_function_scope(pipeline, &function_id).await;
                }
                Ok(())
            }
        }
    }

    async fn authorize(
        &self,
        pipeline: &Pipeline,
        action: &StageAction,
        permission: &str,
        resource: &str,
    ) -> Result<()> {
        self.collaborators
            .identity
            .authorize(pipeline.identity(), permission, resource)
            .await
            .map_err(|err| PipelineError::stage(&action.name, err))
    }

    /// Reads and decodes the input artifact of `action`
    async fn load_input(
        &self,
        pipeline: &Pipeline,
        run: &PipelineRun,
        action: &StageAction,
    ) -> Result<FileMap> {
        let slot = action.input_artifact.ok_or_else(|| {
            PipelineError::Configuration(format!("action '{}' has no input artifact", action.name))
        })?;

        let artifact = run
            .artifacts
            .iter()
            .find(|artifact| artifact.slot == slot)
            .ok_or_else(|| {
                PipelineError::NotFound(format!("artifact '{}' of run {}", slot, run.id))
            })?;

        let location = pipeline.location();
        self.authorize(
            pipeline,
            action,
            READ_ARTIFACT_ACTION,
            &location.object_resource(&artifact.key),
        )
        .await?;

        let bytes = self
            .collaborators
            .artifacts
            .read(location, &artifact.key)
            .await
            .map_err(|err| PipelineError::stage(&action.name, err))?;

        decode_files(&bytes).map_err(|err| PipelineError::stage(&action.name, err.into()))
    }

    /// Writes every output artifact of `action` and records it on the run
    async fn store_outputs(
        &self,
        pipeline: &Pipeline,
        run: &mut PipelineRun,
        action: &StageAction,
        files: &FileMap,
    ) -> Result<()> {
        let bytes =
            encode_files(files).map_err(|err| PipelineError::stage(&action.name, err.into()))?;

        for slot in &action.output_artifacts {
            let key = Artifact::object_key(pipeline.project_name(), run.id, *slot);
            self.collaborators
                .artifacts
                .write(pipeline.location(), &key, bytes.clone())
                .await
                .map_err(|err| PipelineError::stage(&action.name, err))?;

            run.artifacts.push(Artifact {
                slot: *slot,
                location: pipeline.location().name.clone(),
                key,
                size_bytes: bytes.len() as u64,
            });
        }

        Ok(())
    }

    /// Deletes the artifacts a run wrote to the store
    ///
    /// Failures are logged; a leftover object never affects later runs.
    pub async fn discard_artifacts(&self, pipeline: &Pipeline, run: &PipelineRun) {
        for artifact in &run.artifacts {
            if let Err(err) = self
                .collaborators
                .artifacts
                .delete(pipeline.location(), &artifact.key)
                .await
            {
                tracing::warn!(
                    "Failed to delete artifact {} of run {}: {}",
                    artifact.key,
                    run.id,
                    err
                );
            }
        }

        if !run.artifacts.is_empty() {
            tracing::debug!(
                "Deleted {} artifacts of evicted run {}",
                run.artifacts.len(),
                run.id
            );
        }
    }

    /// Narrows the compute-function grants to the deployed function
    ///
    /// Runs after a successful apply, so a failure here is logged and never
    /// fails the run.
    async fn narrow_function_scope(&self, pipeline: &Pipeline, function_id: &str) {
        let scope = pipeline.function_scope();
        if scope.is_resolved() {
            return;
        }

        if let Err(err) = scope.resolve(function_id) {
            tracing::warn!("Not narrowing grants of {}: {}", pipeline.name(), err);
            return;
        }

        match self
            .collaborators
            .identity
            .attach(pipeline.identity(), &pipeline.current_grants())
            .await
        {
            Ok(()) => tracing::info!(
                "Narrowed function grants of {} to {}",
                pipeline.name(),
                scope.current()
            ),
            Err(err) => tracing::warn!(
                "Failed to re-attach grants of {}: {}",
                pipeline.name(),
                err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{
        MemoryArtifactStore, MemoryBuildRunner, MemoryDeployService, MemoryIdentityService,
        MemorySourceConnection,
    };
    use crate::service::factory::PipelineFactory;
    use monorail_core::domain::identity::ConnectionHandle;
    use monorail_core::domain::run::{RunState, RunStatus};
    use monorail_core::domain::spec::PipelineSpec;
    use monorail_core::domain::trigger::ChangeEvent;
    use std::sync::Arc;
    use uuid::Uuid;

    struct Harness {
        source: Arc<MemorySourceConnection>,
        deploy: Arc<MemoryDeployService>,
        collaborators: Collaborators,
    }

    async fn harness() -> Harness {
        let connection = ConnectionHandle::new("connection:acme");
        let source = Arc::new(MemorySourceConnection::new(connection));
        let artifacts = Arc::new(MemoryArtifactStore::new());
        artifacts.create_location("monorail-artifacts").await;
        let deploy = Arc::new(MemoryDeployService::new());

        let collaborators = Collaborators {
            source: source.clone(),
            build: Arc::new(MemoryBuildRunner::new()),
            artifacts,
            deploy: deploy.clone(),
            identity: Arc::new(MemoryIdentityService::new()),
        };

        Harness {
            source,
            deploy,
            collaborators,
        }
    }

    fn project_files(build_spec: bool) -> FileMap {
        let mut files = FileMap::new();
        files.insert(
            "projects/foo/build.yml".to_string(),
            b"Resources: {}".to_vec(),
        );
        if build_spec {
            files.insert(
                "projects/foo/buildspec.yml".to_string(),
                b"version: 0.2".to_vec(),
            );
        }
        files
    }

    async fn pipeline(h: &Harness) -> Pipeline {
        PipelineFactory::new(h.collaborators.clone(), ConnectionHandle::new("connection:acme"))
            .create(PipelineSpec::new(
                "acme/monorepo",
                "main",
                "foo",
                "monorail-artifacts",
            ))
            .await
            .unwrap()
    }

    fn queued() -> PipelineRun {
        PipelineRun::queued(
            Uuid::new_v4(),
            "foo",
            ChangeEvent::new("main", ["projects/foo/index.js"]),
        )
    }

    #[tokio::test]
    async fn test_successful_run() {
        let h = harness().await;
        h.source.push("acme/monorepo", "main", project_files(true)).await;
        let pipeline = pipeline(&h).await;

        let run = Sequencer::new(h.collaborators.clone())
            .execute(&pipeline, queued())
            .await;

        assert_eq!(run.status, RunStatus::Succeeded);
        assert_eq!(run.state, RunState::Idle);
        assert_eq!(run.stages.len(), 4);
        assert_eq!(run.artifacts.len(), 2);
        assert!(run.change_set.is_some());
        assert_eq!(h.deploy.apply_calls(), 1);
        assert!(pipeline.function_scope().is_resolved());
    }

    #[tokio::test]
    async fn test_missing_build_spec_fails_build() {
        let h = harness().await;
        h.source.push("acme/monorepo", "main", project_files(false)).await;
        let pipeline = pipeline(&h).await;

        let run = Sequencer::new(h.collaborators.clone())
            .execute(&pipeline, queued())
            .await;

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.state, RunState::Failed);
        let failure = run.failure.unwrap();
        assert_eq!(failure.stage, "Build");
        assert!(failure.error.contains("buildspec.yml"));
        assert_eq!(h.deploy.plan_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_snapshot_fails_source() {
        let h = harness().await;
        let pipeline = pipeline(&h).await;

        let run = Sequencer::new(h.collaborators.clone())
            .execute(&pipeline, queued())
            .await;

        assert_eq!(run.failure.unwrap().stage, "Source");
        assert_eq!(run.stages.len(), 1);
    }
}
