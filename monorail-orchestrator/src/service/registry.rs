//! Pipeline Registry
//!
//! The set of concurrently defined pipelines, keyed by project name.
//!
//! A project name is reserved before its pipeline is built, so two concurrent
//! definitions for one project never both reach the collaborators.

use monorail_core::{PipelineError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

use super::pipeline::Pipeline;

#[derive(Default)]
pub struct PipelineRegistry {
    pipelines: RwLock<BTreeMap<String, Arc<Pipeline>>>,
    reserved: Mutex<BTreeSet<String>>,
}

/// Exclusive claim on a project name, released when dropped
pub struct Reservation<'a> {
    registry: &'a PipelineRegistry,
    project_name: String,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `project_name` for a pipeline about to be built
    ///
    /// Fails if the project already has a pipeline or another definition
    /// holds the claim.
    pub async fn reserve(&self, project_name: &str) -> Result<Reservation<'_>> {
        let already_defined = || {
            PipelineError::Configuration(format!(
                "a pipeline for project '{}' is already defined",
                project_name
            ))
        };

        if !self
            .reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(project_name.to_string())
        {
            return Err(already_defined());
        }

        let reservation = Reservation {
            registry: self,
            project_name: project_name.to_string(),
        };

        if self.contains(project_name).await {
            return Err(already_defined());
        }

        Ok(reservation)
    }

    fn release(&self, project_name: &str) {
        self.reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(project_name);
    }

    pub async fn contains(&self, project_name: &str) -> bool {
        self.pipelines.read().await.contains_key(project_name)
    }

    pub async fn get(&self, project_name: &str) -> Result<Arc<Pipeline>> {
        self.pipelines
            .read()
            .await
            .get(project_name)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(format!("pipeline '{}'", project_name)))
    }

    /// All pipelines, ordered by project name
    pub async fn list(&self) -> Vec<Arc<Pipeline>> {
        self.pipelines.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.pipelines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pipelines.read().await.is_empty()
    }
}

impl Reservation<'_> {
    /// Adds the pipeline built under this claim
    pub async fn register(self, pipeline: Arc<Pipeline>) -> Result<()> {
        if pipeline.project_name() != self.project_name {
            return Err(PipelineError::Configuration(format!(
                "pipeline for '{}' registered under the claim for '{}'",
                pipeline.project_name(),
                self.project_name
            )));
        }

        self.registry
            .pipelines
            .write()
            .await
            .insert(self.project_name.clone(), pipeline);
        Ok(())
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.project_name);
    }
}
