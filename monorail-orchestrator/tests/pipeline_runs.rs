//! End-to-end run behavior: triggering, ordering, change-set reuse, failure
//! containment, queueing and the artifact chain.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use monorail_core::CollaboratorError;
use monorail_core::domain::artifact::{ArtifactSlot, FileMap, decode_files};
use monorail_core::domain::change_set::CHANGE_SET_NAME;
use monorail_core::domain::permission::{GrantCategory, PermissionGrant};
use monorail_core::domain::run::{RunState, RunStatus, StageOutcome};
use monorail_orchestrator::collaborator::{
    ArtifactStore, BuildRequest, BuildRunner, MemoryBuildRunner, MemoryIdentityService,
};

const FOO: &str = "lambda-project-foo";
const FOOBAR: &str = "lambda-project-foobar";

#[tokio::test]
async fn test_change_under_project_fires_only_that_pipeline() {
    let h = harness().await;
    h.push_projects(&[FOO, FOOBAR]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();
    h.orchestrator.define_pipeline(record(FOOBAR)).await.unwrap();

    let mut completed = h.subscribe();
    let result = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/index.js"]))
        .await;

    assert_eq!(result.queued.len(), 1);
    assert_eq!(result.queued[0].project_name, FOO);

    let run = wait_for(&mut completed, result.queued[0].run_id).await;
    assert_eq!(run.status, RunStatus::Succeeded);
    assert!(h.orchestrator.runs(FOOBAR).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_change_in_both_projects_fires_both() {
    let h = harness().await;
    h.push_projects(&[FOO, FOOBAR]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();
    h.orchestrator.define_pipeline(record(FOOBAR)).await.unwrap();

    let mut completed = h.subscribe();
    let result = h
        .orchestrator
        .dispatch(event(&[
            "projects/lambda-project-foo/index.js",
            "projects/lambda-project-foobar/index.js",
        ]))
        .await;

    let ids: Vec<_> = result.queued.iter().map(|q| q.run_id).collect();
    assert_eq!(ids.len(), 2);

    let runs = wait_for_all(&mut completed, &ids).await;
    assert!(runs.iter().all(|run| run.status == RunStatus::Succeeded));

    // Each pipeline deploys its own stack
    assert!(h.deploy.stack(FOO).await.is_some());
    assert!(h.deploy.stack(FOOBAR).await.is_some());
}

#[tokio::test]
async fn test_other_branch_fires_nothing() {
    let h = harness().await;
    h.push_projects(&[FOO]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    let mut dev = event(&["projects/lambda-project-foo/index.js"]);
    dev.branch = "dev".to_string();

    let result = h.orchestrator.dispatch(dev).await;
    assert!(result.queued.is_empty());
    assert!(h.orchestrator.runs(FOO).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stages_run_in_order() {
    let h = harness().await;
    h.push_projects(&[FOO]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    let mut completed = h.subscribe();
    let result = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/index.js"]))
        .await;
    let run = wait_for(&mut completed, result.queued[0].run_id).await;

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.state, RunState::Idle);

    let actions: Vec<(&str, &str, u32)> = run
        .stages
        .iter()
        .map(|s| (s.stage.as_str(), s.action.as_str(), s.run_order))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("Source", "Source", 1),
            ("Build", "Build", 2),
            ("Deploy", "create-deploy", 3),
            ("Deploy", "execute-deploy", 4),
        ]
    );

    for pair in run.stages.windows(2) {
        let previous = pair[0].completed_at.expect("previous action completed");
        let next = pair[1].completed_at.expect("next action completed");
        assert!(previous <= pair[1].started_at);
        assert!(previous < next);
        assert_eq!(pair[0].outcome, Some(StageOutcome::Succeeded));
    }

    // Artifacts are written under the project's prefix of the shared location
    let keys = h.artifacts.keys(LOCATION).await;
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|key| key.starts_with("lambda-project-foo/")));
}

#[tokio::test]
async fn test_change_set_reused_across_runs() {
    let h = harness().await;
    h.push_projects(&[FOO]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    let mut completed = h.subscribe();
    let first = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/index.js"]))
        .await;
    let first = wait_for(&mut completed, first.queued[0].run_id).await;

    let second = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/build.yml"]))
        .await;
    let second = wait_for(&mut completed, second.queued[0].run_id).await;

    let first_set = first.change_set.expect("first change set");
    let second_set = second.change_set.expect("second change set");

    assert_eq!(first_set.change_set_name, CHANGE_SET_NAME);
    assert_eq!(second_set.change_set_name, CHANGE_SET_NAME);
    assert_eq!(first_set.stack_name, FOO);
    assert_ne!(first_set.id, second_set.id);

    // The second plan superseded the first and was the one executed
    assert_eq!(h.deploy.pending_count().await, 0);
    assert_eq!(
        h.deploy.stack(FOO).await.unwrap().change_set_id,
        second_set.id
    );
    assert_eq!(h.deploy.plan_calls(), 2);
    assert_eq!(h.deploy.apply_calls(), 2);
}

#[tokio::test]
async fn test_build_failure_is_contained() {
    let h = harness().await;
    let mut files = project_files(FOO, false);
    files.extend(project_files(FOOBAR, true));
    h.push(files).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();
    h.orchestrator.define_pipeline(record(FOOBAR)).await.unwrap();

    let mut completed = h.subscribe();
    let result = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/index.js"]))
        .await;
    let failed = wait_for(&mut completed, result.queued[0].run_id).await;

    assert_eq!(failed.status, RunStatus::Failed);
    assert_eq!(failed.state, RunState::Failed);
    let failure = failed.failure.clone().expect("failure recorded");
    assert_eq!(failure.stage, "Build");
    assert!(failure.error.contains("buildspec.yml"));

    // Deploy collaborators were never reached
    assert_eq!(h.deploy.plan_calls(), 0);
    assert_eq!(h.deploy.apply_calls(), 0);
    assert!(failed.change_set.is_none());

    // The sibling pipeline is unaffected
    let sibling = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foobar/index.js"]))
        .await;
    let sibling = wait_for(&mut completed, sibling.queued[0].run_id).await;
    assert_eq!(sibling.status, RunStatus::Succeeded);

    // The next event on the failed pipeline starts fresh from Idle
    h.push_projects(&[FOO, FOOBAR]).await;
    let retry = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/buildspec.yml"]))
        .await;
    let retry = wait_for(&mut completed, retry.queued[0].run_id).await;

    assert_eq!(retry.status, RunStatus::Succeeded);
    assert_eq!(retry.stages.len(), 4);
    assert!(retry.failure.is_none());
}

#[tokio::test]
async fn test_missing_template_fails_deploy_plan() {
    let h = harness().await;
    let mut files = project_files(FOO, true);
    files.remove("projects/lambda-project-foo/build.yml");
    h.push(files).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    let mut completed = h.subscribe();
    let result = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/index.js"]))
        .await;
    let run = wait_for(&mut completed, result.queued[0].run_id).await;

    let failure = run.failure.expect("failure recorded");
    assert_eq!(failure.stage, "Deploy");
    assert_eq!(failure.action, "create-deploy");
    assert_eq!(h.deploy.apply_calls(), 0);
}

#[tokio::test]
async fn test_permission_denial_fails_run() {
    let boundary = vec![PermissionGrant::deny(
        GrantCategory::FunctionLifecycle,
        ["function:Create"],
        ["*"],
    )];
    let h = build_harness(
        Arc::new(MemoryBuildRunner::new()),
        MemoryIdentityService::with_boundary(boundary),
    )
    .await;
    h.push_projects(&[FOO]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    let mut completed = h.subscribe();
    let result = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/index.js"]))
        .await;
    let run = wait_for(&mut completed, result.queued[0].run_id).await;

    assert_eq!(run.status, RunStatus::Failed);
    let failure = run.failure.expect("failure recorded");
    assert_eq!(failure.action, "execute-deploy");
    assert!(failure.error.starts_with("permission denied"));

    assert_eq!(h.deploy.plan_calls(), 1);
    assert_eq!(h.deploy.apply_calls(), 0);
}

#[tokio::test]
async fn test_function_grants_narrow_after_first_deploy() {
    let h = harness().await;
    h.push_projects(&[FOO]).await;
    let pipeline = h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    assert_eq!(
        pipeline.function_scope().current(),
        "function:lambda-project-foo/*"
    );

    let mut completed = h.subscribe();
    let result = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/index.js"]))
        .await;
    wait_for(&mut completed, result.queued[0].run_id).await;

    let function_id = h.deploy.stack(FOO).await.unwrap().function_id;
    assert_eq!(pipeline.function_scope().current(), function_id);

    let attached = h.identity.grants(pipeline.identity()).await.unwrap();
    let function_grant = attached
        .iter()
        .find(|g| g.category == GrantCategory::FunctionLifecycle)
        .unwrap();
    assert_eq!(
        function_grant.resources.iter().collect::<Vec<_>>(),
        vec![&function_id]
    );

    // A later run still passes the narrowed check
    let result = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/index.js"]))
        .await;
    let run = wait_for(&mut completed, result.queued[0].run_id).await;
    assert_eq!(run.status, RunStatus::Succeeded);
}

/// Build runner that holds every build briefly and tracks overlap
#[derive(Default)]
struct SlowBuildRunner {
    inner: MemoryBuildRunner,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[async_trait]
impl BuildRunner for SlowBuildRunner {
    async fn run(&self, request: &BuildRequest) -> Result<FileMap, CollaboratorError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let output = self.inner.run(request).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        output
    }
}

#[tokio::test]
async fn test_events_during_a_run_are_queued_in_order() {
    let build = Arc::new(SlowBuildRunner::default());
    let h = build_harness(build.clone(), MemoryIdentityService::new()).await;
    h.push_projects(&[FOO]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    let mut completed = h.subscribe();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let result = h
            .orchestrator
            .dispatch(event(&["projects/lambda-project-foo/index.js"]))
            .await;
        ids.push(result.queued[0].run_id);
    }

    let runs = wait_for_all(&mut completed, &ids).await;

    assert!(runs.iter().all(|run| run.status == RunStatus::Succeeded));
    assert_eq!(build.max_active.load(Ordering::SeqCst), 1);

    // Runs never overlap and start in arrival order
    for pair in runs.windows(2) {
        let previous_end = pair[0].finished_at.expect("finished");
        let next_start = pair[1].started_at.expect("started");
        assert!(previous_end <= next_start);
    }

    let listed: Vec<_> = h
        .orchestrator
        .runs(FOO)
        .await
        .unwrap()
        .iter()
        .map(|run| run.id)
        .collect();
    assert_eq!(listed, ids);
}

/// Build runner that holds builds of one project until released
struct GatedBuildRunner {
    inner: MemoryBuildRunner,
    gated_prefix: String,
    gate: tokio::sync::Semaphore,
}

impl GatedBuildRunner {
    fn new(project: &str) -> Self {
        Self {
            inner: MemoryBuildRunner::new(),
            gated_prefix: format!("projects/{}/", project),
            gate: tokio::sync::Semaphore::new(0),
        }
    }
}

#[async_trait]
impl BuildRunner for GatedBuildRunner {
    async fn run(&self, request: &BuildRequest) -> Result<FileMap, CollaboratorError> {
        if request.build_spec_path.starts_with(&self.gated_prefix) {
            let _permit = self.gate.acquire().await.unwrap();
        }
        self.inner.run(request).await
    }
}

#[tokio::test]
async fn test_full_queue_skips_pipeline_without_blocking_others() {
    let build = Arc::new(GatedBuildRunner::new(FOO));
    let h = configured_harness(build.clone(), MemoryIdentityService::new(), |config| {
        config.run_queue_capacity = 1;
    })
    .await;
    h.push_projects(&[FOO, FOOBAR]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();
    h.orchestrator.define_pipeline(record(FOOBAR)).await.unwrap();

    let foo_change = || event(&["projects/lambda-project-foo/index.js"]);

    // First run is picked up by the worker and held in Build
    let active = h.orchestrator.dispatch(foo_change()).await.queued[0].run_id;
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.orchestrator.run(active).await.unwrap().status != RunStatus::Running {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first run did not start");

    // Second run takes the only queue slot
    let waiting = h.orchestrator.dispatch(foo_change()).await;
    assert_eq!(waiting.queued.len(), 1);
    assert!(waiting.skipped.is_empty());

    let mut completed = h.subscribe();
    let result = tokio::time::timeout(
        Duration::from_secs(1),
        h.orchestrator.dispatch(event(&[
            "projects/lambda-project-foo/index.js",
            "projects/lambda-project-foobar/index.js",
        ])),
    )
    .await
    .expect("dispatch waited on a full queue");

    assert_eq!(result.queued.len(), 1);
    assert_eq!(result.queued[0].project_name, FOOBAR);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].project_name, FOO);
    assert!(result.skipped[0].reason.contains("full"));

    let sibling = wait_for(&mut completed, result.queued[0].run_id).await;
    assert_eq!(sibling.status, RunStatus::Succeeded);

    // The skipped event left no run behind
    assert_eq!(h.orchestrator.runs(FOO).await.unwrap().len(), 2);

    build.gate.add_permits(2);
    let runs = wait_for_all(&mut completed, &[active, waiting.queued[0].run_id]).await;
    assert!(runs.iter().all(|run| run.status == RunStatus::Succeeded));
}

#[tokio::test]
async fn test_binary_files_survive_the_artifact_chain() {
    let build = Arc::new(MemoryBuildRunner::new());
    let h = build_harness(build.clone(), MemoryIdentityService::new()).await;

    let archive = vec![0x50, 0x4b, 0x03, 0x04, 0xff, 0xfe, 0x00, 0x80];
    let mut files = project_files(FOO, true);
    files.insert(
        "projects/lambda-project-foo/handler.zip".to_string(),
        archive.clone(),
    );
    h.push(files).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    let mut completed = h.subscribe();
    let result = h
        .orchestrator
        .dispatch(event(&["projects/lambda-project-foo/handler.zip"]))
        .await;
    let run = wait_for(&mut completed, result.queued[0].run_id).await;
    assert_eq!(run.status, RunStatus::Succeeded);

    // The build saw the archive byte for byte
    let requests = build.requests().await;
    assert_eq!(
        requests[0].input.get("projects/lambda-project-foo/handler.zip"),
        Some(&archive)
    );

    // And so does anything reading the stored build output
    let output = run
        .artifacts
        .iter()
        .find(|artifact| artifact.slot == ArtifactSlot::BuildOutput)
        .expect("build output recorded");
    let location = h.artifacts.resolve(LOCATION).await.unwrap();
    let bytes = h.artifacts.read(&location, &output.key).await.unwrap();
    let decoded = decode_files(&bytes).unwrap();
    assert_eq!(decoded.get("handler.zip"), Some(&archive));
}

#[tokio::test]
async fn test_evicted_runs_release_their_artifacts() {
    let h = configured_harness(
        Arc::new(MemoryBuildRunner::new()),
        MemoryIdentityService::new(),
        |config| config.run_history_limit = 1,
    )
    .await;
    h.push_projects(&[FOO]).await;
    h.orchestrator.define_pipeline(record(FOO)).await.unwrap();

    let mut completed = h.subscribe();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let result = h
            .orchestrator
            .dispatch(event(&["projects/lambda-project-foo/index.js"]))
            .await;
        let run = wait_for(&mut completed, result.queued[0].run_id).await;
        assert_eq!(run.status, RunStatus::Succeeded);
        ids.push(run.id);
    }

    let latest = format!("{}/{}/", FOO, ids[2]);
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let keys = h.artifacts.keys(LOCATION).await;
            if keys.len() == 2 && keys.iter().all(|key| key.starts_with(&latest)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("artifacts of evicted runs were not deleted");

    let listed = h.orchestrator.runs(FOO).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, ids[2]);
}
