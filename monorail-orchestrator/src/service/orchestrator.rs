//! Orchestrator
//!
//! Ties the factory, registry, run queues and run history together behind the
//! operations the HTTP API exposes.

use monorail_core::domain::identity::ConnectionHandle;
use monorail_core::domain::run::PipelineRun;
use monorail_core::domain::trigger::{ChangeEvent, TriggerDecision};
use monorail_core::dto::event::DispatchResult;
use monorail_core::dto::pipeline::PipelineRecord;
use monorail_core::Result;
use std::sync::Arc;
use uuid::Uuid;

use super::factory::PipelineFactory;
use super::history::RunHistory;
use super::pipeline::Pipeline;
use super::registry::PipelineRegistry;
use super::sequencer::Sequencer;
use crate::collaborator::Collaborators;
use crate::config::Config;
use crate::scheduler::{Dispatcher, RunQueue};

pub struct Orchestrator {
    factory: PipelineFactory,
    registry: PipelineRegistry,
    dispatcher: Dispatcher,
    sequencer: Arc<Sequencer>,
    history: Arc<RunHistory>,
    artifact_location: String,
    queue_capacity: usize,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, config: &Config) -> Self {
        let connection = ConnectionHandle::new(config.connection_ref.clone());
        let mut factory = PipelineFactory::new(collaborators.clone(), connection);
        if let Some(image) = &config.build_image {
            factory = factory.with_build_image(image.clone());
        }

        Self {
            factory,
            registry: PipelineRegistry::new(),
            dispatcher: Dispatcher::new(),
            sequencer: Arc::new(Sequencer::new(collaborators)),
            history: Arc::new(RunHistory::new(config.run_history_limit)),
            artifact_location: config.artifact_location.clone(),
            queue_capacity: config.run_queue_capacity,
        }
    }

    /// Creates, registers and starts the run queue of a pipeline
    ///
    /// A project that already has a pipeline, or is being defined by a
    /// concurrent call, is rejected before anything is wired for the new record.
    pub async fn define_pipeline(&self, record: PipelineRecord) -> Result<Arc<Pipeline>> {
        let reservation = self.registry.reserve(&record.project_name).await?;

        let spec = record.into_spec(self.artifact_location.clone());
        let pipeline = Arc::new(self.factory.create(spec).await?);
        reservation.register(pipeline.clone()).await?;

        let queue = RunQueue::spawn(
            pipeline.clone(),
            self.sequencer.clone(),
            self.history.clone(),
            self.queue_capacity,
        );
        self.dispatcher.add(queue).await;

        Ok(pipeline)
    }

    pub async fn pipelines(&self) -> Vec<Arc<Pipeline>> {
        self.registry.list().await
    }

    pub async fn pipeline(&self, project_name: &str) -> Result<Arc<Pipeline>> {
        self.registry.get(project_name).await
    }

    /// Queues a run on every pipeline whose filter accepts `event`
    pub async fn dispatch(&self, event: ChangeEvent) -> DispatchResult {
        self.dispatcher.dispatch(&event).await
    }

    /// Evaluates `event` against one pipeline's filter without queueing a run
    pub async fn check_trigger(
        &self,
        project_name: &str,
        event: &ChangeEvent,
    ) -> Result<TriggerDecision> {
        Ok(self.registry.get(project_name).await?.evaluate(event))
    }

    pub async fn run(&self, run_id: Uuid) -> Result<PipelineRun> {
        self.history.get(run_id).await
    }

    /// Runs of a defined pipeline, oldest first
    pub async fn runs(&self, project_name: &str) -> Result<Vec<PipelineRun>> {
        self.registry.get(project_name).await?;
        Ok(self.history.list(project_name).await)
    }

    pub fn history(&self) -> &Arc<RunHistory> {
        &self.history
    }
}
