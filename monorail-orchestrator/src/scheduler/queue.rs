//! Per-pipeline run queue
//!
//! Each pipeline gets one bounded channel and one worker task draining it, so
//! at most one run is active per pipeline and events accepted during a run
//! wait their turn in arrival order. Enqueueing never waits: a full queue
//! rejects the run.

use monorail_core::domain::run::PipelineRun;
use monorail_core::domain::trigger::ChangeEvent;
use monorail_core::{PipelineError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::service::history::RunHistory;
use crate::service::pipeline::Pipeline;
use crate::service::sequencer::Sequencer;

pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Sending half of a pipeline's run queue
#[derive(Clone)]
pub struct RunQueue {
    pipeline: Arc<Pipeline>,
    sequencer: Arc<Sequencer>,
    history: Arc<RunHistory>,
    sender: mpsc::Sender<PipelineRun>,
}

impl RunQueue {
    /// Spawns the worker of `pipeline` and returns its queue
    pub fn spawn(
        pipeline: Arc<Pipeline>,
        sequencer: Arc<Sequencer>,
        history: Arc<RunHistory>,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        tokio::spawn(run_worker(
            pipeline.clone(),
            sequencer.clone(),
            history.clone(),
            receiver,
        ));

        Self {
            pipeline,
            sequencer,
            history,
            sender,
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Queues a run for `event` and returns its id
    ///
    /// Returns `QueueFull` without recording a run when every slot is taken.
    pub async fn enqueue(&self, event: ChangeEvent) -> Result<Uuid> {
        let project_name = self.pipeline.project_name();

        let permit = match self.sender.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => {
                return Err(PipelineError::QueueFull(project_name.to_string()));
            }
            Err(TrySendError::Closed(())) => {
                return Err(PipelineError::QueueClosed(project_name.to_string()));
            }
        };

        let run = PipelineRun::queued(Uuid::new_v4(), project_name, event);
        let run_id = run.id;

        // Recorded before the worker can see it, so mark_running always finds it
        let evicted = self.history.record(run.clone()).await;
        permit.send(run);

        tracing::debug!("Queued run {} for {}", run_id, self.pipeline.name());
        discard(&self.sequencer, &self.pipeline, evicted).await;
        Ok(run_id)
    }
}

/// Deletes the stored artifacts of runs dropped from the history
async fn discard(sequencer: &Sequencer, pipeline: &Pipeline, evicted: Vec<PipelineRun>) {
    for run in &evicted {
        sequencer.discard_artifacts(pipeline, run).await;
    }
}

/// Executes queued runs one at a time until every sender is dropped
async fn run_worker(
    pipeline: Arc<Pipeline>,
    sequencer: Arc<Sequencer>,
    history: Arc<RunHistory>,
    mut receiver: mpsc::Receiver<PipelineRun>,
) {
    tracing::debug!("Run worker started for {}", pipeline.name());

    while let Some(run) = receiver.recv().await {
        history.mark_running(run.id).await;
        let finished = sequencer.execute(&pipeline, run).await;
        let evicted = history.record(finished).await;
        discard(&sequencer, &pipeline, evicted).await;
    }

    tracing::debug!("Run worker stopped for {}", pipeline.name());
}
