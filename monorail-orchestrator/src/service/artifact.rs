//! Artifact Store Binding
//!
//! Resolves the shared artifact location every pipeline reads and writes.
//! The location is provisioned out of band and never created here.

use monorail_core::domain::artifact::ArtifactLocationHandle;
use monorail_core::{PipelineError, Result};
use std::sync::Arc;

use crate::collaborator::{ArtifactStore, CollaboratorError};

/// Binds pipelines to a pre-existing artifact location
#[derive(Clone)]
pub struct ArtifactStoreBinding {
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactStoreBinding {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Resolves `name` to a location handle
    ///
    /// Returns `NotFound` if the location does not exist. Resolving the same
    /// name twice yields equal handles.
    pub async fn resolve(&self, name: &str) -> Result<ArtifactLocationHandle> {
        if name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "artifact location name cannot be empty".to_string(),
            ));
        }

        match self.store.resolve(name).await {
            Ok(handle) => {
                tracing::debug!("Resolved artifact location: {}", handle.name);
                Ok(handle)
            }
            Err(CollaboratorError::NotFound(_)) => {
                tracing::warn!("Artifact location not found: {}", name);
                Err(PipelineError::NotFound(format!(
                    "artifact location '{}'",
                    name
                )))
            }
            Err(err) => Err(err.into()),
        }
    }
}
