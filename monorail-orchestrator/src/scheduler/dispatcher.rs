//! Change event dispatcher
//!
//! Fans a change event out to every pipeline whose trigger filter accepts it.
//! Pipelines are independent: enqueueing never waits, and a full or closed
//! queue on one pipeline is reported as skipped without holding up the rest.

use monorail_core::domain::trigger::{ChangeEvent, TriggerDecision};
use monorail_core::dto::event::{DispatchResult, QueuedRun, SkippedRun};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::queue::RunQueue;

#[derive(Default)]
pub struct Dispatcher {
    queues: RwLock<BTreeMap<String, RunQueue>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the queue of a newly registered pipeline
    pub async fn add(&self, queue: RunQueue) {
        let project_name = queue.pipeline().project_name().to_string();
        self.queues.write().await.insert(project_name, queue);
    }

    /// Queues a run on every pipeline that accepts `event`
    pub async fn dispatch(&self, event: &ChangeEvent) -> DispatchResult {
        // Release the lock before enqueueing
        let queues: Vec<RunQueue> = self.queues.read().await.values().cloned().collect();
        let mut result = DispatchResult::default();

        for queue in queues {
            let pipeline = queue.pipeline().clone();

            match pipeline.evaluate(event) {
                TriggerDecision::Fire { matched_paths } => {
                    tracing::debug!(
                        "{} fired by {} changed paths",
                        pipeline.name(),
                        matched_paths.len()
                    );
                    match queue.enqueue(event.clone()).await {
                        Ok(run_id) => result.queued.push(QueuedRun {
                            project_name: pipeline.project_name().to_string(),
                            run_id,
                        }),
                        Err(err) => {
                            tracing::warn!("Skipped run for {}: {}", pipeline.name(), err);
                            result.skipped.push(SkippedRun {
                                project_name: pipeline.project_name().to_string(),
                                reason: err.to_string(),
                            });
                        }
                    }
                }
                TriggerDecision::Mismatch { reason } => {
                    tracing::debug!("{} not triggered: {}", pipeline.name(), reason);
                }
            }
        }

        if result.queued.is_empty() && result.skipped.is_empty() {
            tracing::debug!("Change event on {} fired no pipeline", event.branch);
        } else {
            tracing::info!(
                "Change event on {} queued {} runs, skipped {}",
                event.branch,
                result.queued.len(),
                result.skipped.len()
            );
        }

        result
    }
}
