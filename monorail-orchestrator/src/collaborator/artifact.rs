//! Artifact store collaborator
//!
//! Object store with location/key semantics. Locations are provisioned out of
//! band; the orchestrator only resolves them and reads, writes and deletes
//! objects.

use async_trait::async_trait;
use monorail_core::domain::artifact::ArtifactLocationHandle;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CollaboratorError, Result};

/// Collaborator trait for the shared artifact store
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Resolves a pre-existing location by name
    ///
    /// Returns `NotFound` if no location of that name exists.
    async fn resolve(&self, name: &str) -> Result<ArtifactLocationHandle>;

    /// Reads the object stored at `key`
    async fn read(&self, location: &ArtifactLocationHandle, key: &str) -> Result<Vec<u8>>;

    /// Writes (or overwrites) the object at `key`
    async fn write(
        &self,
        location: &ArtifactLocationHandle,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<()>;

    /// Deletes the object at `key`; a missing object is not an error
    async fn delete(&self, location: &ArtifactLocationHandle, key: &str) -> Result<()>;
}

/// In-memory implementation of ArtifactStore
#[derive(Default)]
pub struct MemoryArtifactStore {
    locations: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions an empty location, as would happen out of band
    pub async fn create_location(&self, name: &str) {
        self.locations
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }

    /// Lists the object keys of a location, sorted
    pub async fn keys(&self, name: &str) -> Vec<String> {
        let locations = self.locations.read().await;
        let mut keys: Vec<String> = locations
            .get(name)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn resolve(&self, name: &str) -> Result<ArtifactLocationHandle> {
        if self.locations.read().await.contains_key(name) {
            Ok(ArtifactLocationHandle::new(name))
        } else {
            Err(CollaboratorError::NotFound(format!(
                "artifact location '{}'",
                name
            )))
        }
    }

    async fn read(&self, location: &ArtifactLocationHandle, key: &str) -> Result<Vec<u8>> {
        let locations = self.locations.read().await;
        locations
            .get(&location.name)
            .ok_or_else(|| {
                CollaboratorError::NotFound(format!("artifact location '{}'", location.name))
            })?
            .get(key)
            .cloned()
            .ok_or_else(|| {
                CollaboratorError::NotFound(format!("object '{}' in '{}'", key, location.name))
            })
    }

    async fn write(
        &self,
        location: &ArtifactLocationHandle,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let mut locations = self.locations.write().await;
        let objects = locations.get_mut(&location.name).ok_or_else(|| {
            CollaboratorError::NotFound(format!("artifact location '{}'", location.name))
        })?;
        objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, location: &ArtifactLocationHandle, key: &str) -> Result<()> {
        let mut locations = self.locations.write().await;
        let objects = locations.get_mut(&location.name).ok_or_else(|| {
            CollaboratorError::NotFound(format!("artifact location '{}'", location.name))
        })?;
        objects.remove(key);
        Ok(())
    }
}
