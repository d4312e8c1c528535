//! Identity and permission collaborator

use async_trait::async_trait;
use monorail_core::domain::identity::IdentityHandle;
use monorail_core::domain::permission::{PermissionGrant, is_allowed};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CollaboratorError, Result};

/// Collaborator trait for the identity/permission system
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Creates an execution identity with no grants
    async fn create_identity(&self, name: &str) -> Result<IdentityHandle>;

    /// Replaces the grants attached to `identity`
    async fn attach(&self, identity: &IdentityHandle, grants: &[PermissionGrant]) -> Result<()>;

    /// Checks that `identity` may perform `action` on `resource`
    ///
    /// Returns `PermissionDenied` when the attached grants do not allow it.
    async fn authorize(
        &self,
        identity: &IdentityHandle,
        action: &str,
        resource: &str,
    ) -> Result<()>;
}

/// In-memory implementation of IdentityService
///
/// An optional boundary of deny grants is evaluated alongside every identity's
/// own grants, so an explicit deny in the boundary always wins.
#[derive(Default)]
pub struct MemoryIdentityService {
    identities: RwLock<HashMap<Uuid, Vec<PermissionGrant>>>,
    boundary: Vec<PermissionGrant>,
}

impl MemoryIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service whose identities are all subject to `boundary`
    pub fn with_boundary(boundary: Vec<PermissionGrant>) -> Self {
        Self {
            identities: RwLock::new(HashMap::new()),
            boundary,
        }
    }

    /// Grants currently attached to `identity`
    pub async fn grants(&self, identity: &IdentityHandle) -> Option<Vec<PermissionGrant>> {
        self.identities.read().await.get(&identity.id).cloned()
    }
}

#[async_trait]
impl IdentityService for MemoryIdentityService {
    async fn create_identity(&self, name: &str) -> Result<IdentityHandle> {
        let handle = IdentityHandle {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.identities.write().await.insert(handle.id, Vec::new());
        debug!("Created identity {} ({})", handle.name, handle.id);
        Ok(handle)
    }

    async fn attach(&self, identity: &IdentityHandle, grants: &[PermissionGrant]) -> Result<()> {
        let mut identities = self.identities.write().await;
        let attached = identities
            .get_mut(&identity.id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("identity '{}'", identity.name)))?;
        *attached = grants.to_vec();
        Ok(())
    }

    async fn authorize(
        &self,
        identity: &IdentityHandle,
        action: &str,
        resource: &str,
    ) -> Result<()> {
        let identities = self.identities.read().await;
        let grants = identities
            .get(&identity.id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("identity '{}'", identity.name)))?;

        let effective: Vec<PermissionGrant> =
            grants.iter().chain(self.boundary.iter()).cloned().collect();

        if is_allowed(&effective, action, resource) {
            Ok(())
        } else {
            Err(CollaboratorError::PermissionDenied {
                action: action.to_string(),
                resource: resource.to_string(),
            })
        }
    }
}
