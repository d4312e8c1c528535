//! Shared harness for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use monorail_core::domain::artifact::FileMap;
use monorail_core::domain::identity::ConnectionHandle;
use monorail_core::domain::run::PipelineRun;
use monorail_core::domain::trigger::ChangeEvent;
use monorail_core::dto::pipeline::PipelineRecord;
use monorail_orchestrator::collaborator::{
    BuildRunner, Collaborators, MemoryArtifactStore, MemoryBuildRunner, MemoryDeployService,
    MemoryIdentityService, MemorySourceConnection,
};
use monorail_orchestrator::config::Config;
use monorail_orchestrator::service::Orchestrator;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const REPOSITORY: &str = "acme/monorepo";
pub const BRANCH: &str = "main";
pub const CONNECTION: &str = "connection:acme";
pub const LOCATION: &str = "monorail-artifacts";

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub source: Arc<MemorySourceConnection>,
    pub artifacts: Arc<MemoryArtifactStore>,
    pub deploy: Arc<MemoryDeployService>,
    pub identity: Arc<MemoryIdentityService>,
    pub collaborators: Collaborators,
}

pub async fn harness() -> Harness {
    build_harness(
        Arc::new(MemoryBuildRunner::new()),
        MemoryIdentityService::new(),
    )
    .await
}

pub async fn build_harness(
    build: Arc<dyn BuildRunner>,
    identity: MemoryIdentityService,
) -> Harness {
    configured_harness(build, identity, |_| {}).await
}

/// Harness whose orchestrator config is adjusted by `configure`
pub async fn configured_harness(
    build: Arc<dyn BuildRunner>,
    identity: MemoryIdentityService,
    configure: impl FnOnce(&mut Config),
) -> Harness {
    let source = Arc::new(MemorySourceConnection::new(ConnectionHandle::new(CONNECTION)));
    let artifacts = Arc::new(MemoryArtifactStore::new());
    artifacts.create_location(LOCATION).await;
    let deploy = Arc::new(MemoryDeployService::new());
    let identity = Arc::new(identity);

    let collaborators = Collaborators {
        source: source.clone(),
        build,
        artifacts: artifacts.clone(),
        deploy: deploy.clone(),
        identity: identity.clone(),
    };

    let mut config = Config {
        artifact_location: LOCATION.to_string(),
        connection_ref: CONNECTION.to_string(),
        ..Config::default()
    };
    configure(&mut config);

    Harness {
        orchestrator: Arc::new(Orchestrator::new(collaborators.clone(), &config)),
        source,
        artifacts,
        deploy,
        identity,
        collaborators,
    }
}

pub fn record(project: &str) -> PipelineRecord {
    PipelineRecord {
        repository: REPOSITORY.to_string(),
        branch: BRANCH.to_string(),
        project_name: project.to_string(),
    }
}

pub fn event(paths: &[&str]) -> ChangeEvent {
    ChangeEvent::new(BRANCH, paths.iter().copied())
}

/// Files of a deployable project: a build spec and a deploy template
pub fn project_files(project: &str, with_build_spec: bool) -> FileMap {
    let mut files = FileMap::new();
    files.insert(
        format!("projects/{}/build.yml", project),
        format!("Resources:\n  Handler: {}", project).into_bytes(),
    );
    files.insert(
        format!("projects/{}/index.js", project),
        b"exports.handler = async () => 'ok';".to_vec(),
    );
    if with_build_spec {
        files.insert(
            format!("projects/{}/buildspec.yml", project),
            b"version: 0.2".to_vec(),
        );
    }
    files
}

impl Harness {
    /// Sets the branch head to a monorepo holding deployable `projects`
    pub async fn push_projects(&self, projects: &[&str]) {
        let mut files = FileMap::new();
        files.insert("README.md".to_string(), b"# monorepo".to_vec());
        for project in projects {
            files.extend(project_files(project, true));
        }
        self.source.push(REPOSITORY, BRANCH, files).await;
    }

    pub async fn push(&self, files: FileMap) {
        self.source.push(REPOSITORY, BRANCH, files).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineRun> {
        self.orchestrator.history().subscribe()
    }
}

/// Waits until the run `run_id` finishes
pub async fn wait_for(
    completed: &mut broadcast::Receiver<PipelineRun>,
    run_id: Uuid,
) -> PipelineRun {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match completed.recv().await {
                Ok(run) if run.id == run_id => return run,
                Ok(_) => continue,
                Err(err) => panic!("completed run channel failed: {}", err),
            }
        }
    })
    .await
    .expect("run did not finish in time")
}

/// Waits until every run in `run_ids` finishes, returned in the given order
pub async fn wait_for_all(
    completed: &mut broadcast::Receiver<PipelineRun>,
    run_ids: &[Uuid],
) -> Vec<PipelineRun> {
    let mut finished: Vec<PipelineRun> = Vec::new();

    tokio::time::timeout(Duration::from_secs(5), async {
        while finished.len() < run_ids.len() {
            match completed.recv().await {
                Ok(run) if run_ids.contains(&run.id) => finished.push(run),
                Ok(_) => continue,
                Err(err) => panic!("completed run channel failed: {}", err),
            }
        }
    })
    .await
    .expect("runs did not finish in time");

    run_ids
        .iter()
        .map(|id| {
            finished
                .iter()
                .find(|run| run.id == *id)
                .cloned()
                .expect("finished run")
        })
        .collect()
}
