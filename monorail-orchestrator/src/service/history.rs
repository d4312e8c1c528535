//! Run History
//!
//! In-memory store of pipeline runs, bounded per project. Queued and running
//! records are never evicted; only the oldest finished runs are dropped once a
//! project exceeds its limit. Evicted runs are handed back to the caller so
//! their artifacts can be deleted.

use monorail_core::domain::run::PipelineRun;
use monorail_core::{PipelineError, Result};
use std::collections::{HashMap, VecDeque};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

/// Capacity of the completed-run broadcast channel
const COMPLETED_CHANNEL_CAPACITY: usize = 256;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Default)]
struct HistoryInner {
    runs: HashMap<Uuid, PipelineRun>,
    by_project: HashMap<String, VecDeque<Uuid>>,
}

pub struct RunHistory {
    inner: RwLock<HistoryInner>,
    limit: usize,
    completed: broadcast::Sender<PipelineRun>,
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl RunHistory {
    pub fn new(limit: usize) -> Self {
        let (completed, _) = broadcast::channel(COMPLETED_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(HistoryInner::default()),
            limit: limit.max(1),
            completed,
        }
    }

    /// Inserts or replaces a run record and returns the runs it evicted
    ///
    /// Finished runs are published to [`RunHistory::subscribe`] receivers.
    pub async fn record(&self, run: PipelineRun) -> Vec<PipelineRun> {
        let finished = run.is_finished().then(|| run.clone());

        let evicted = {
            let mut inner = self.inner.write().await;
            let is_new = inner.runs.insert(run.id, run.clone()).is_none();
            if is_new {
                inner
                    .by_project
                    .entry(run.project_name.clone())
                    .or_default()
                    .push_back(run.id);
            }
            self.evict(&mut inner, &run.project_name)
        };

        if let Some(run) = finished {
            // No receivers is fine
            let _ = self.completed.send(run);
        }

        evicted
    }

    /// Marks a queued run as picked up by its pipeline's worker
    pub async fn mark_running(&self, run_id: Uuid) {
        if let Some(run) = self.inner.write().await.runs.get_mut(&run_id) {
            run.start();
        }
    }

    pub async fn get(&self, run_id: Uuid) -> Result<PipelineRun> {
        self.inner
            .read()
            .await
            .runs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(format!("run '{}'", run_id)))
    }

    /// Runs of a project, oldest first
    pub async fn list(&self, project_name: &str) -> Vec<PipelineRun> {
        let inner = self.inner.read().await;
        inner
            .by_project
            .get(project_name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.runs.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Subscribes to runs as they finish
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineRun> {
        self.completed.subscribe()
    }

    fn evict(&self, inner: &mut HistoryInner, project_name: &str) -> Vec<PipelineRun> {
        let HistoryInner { runs, by_project } = inner;
        let mut evicted = Vec::new();
        let Some(ids) = by_project.get_mut(project_name) else {
            return evicted;
        };

        while ids.len() > self.limit {
            let oldest_finished = ids
                .iter()
                .position(|id| runs.get(id).is_some_and(PipelineRun::is_finished));

            match oldest_finished {
                Some(index) => {
                    if let Some(run) = ids.remove(index).and_then(|id| runs.remove(&id)) {
                        evicted.push(run);
                    }
                }
                None => break,
            }
        }

        evicted
    }
}
