//! Collaborator layer
//!
//! Collaborators are the external systems a pipeline drives: the source
//! connection, the build runner, the artifact store, the deploy service and the
//! identity/permission system. Each is a trait so the orchestrator core never
//! depends on a concrete backend; the in-memory implementations here back local
//! mode and the tests.
//!
//! Every method reports failures as [`CollaboratorError`]. Retries, timeouts
//! and cancellation are the collaborator's own business.

mod artifact;
mod build;
mod deploy;
mod identity;
mod source;

use std::sync::Arc;

pub use monorail_core::CollaboratorError;

// Re-export traits
pub use artifact::ArtifactStore;
pub use build::{BuildRequest, BuildRunner};
pub use deploy::{ApplyOutcome, DeployService};
pub use identity::IdentityService;
pub use source::{SourceConnection, SourceRequest, TriggerRegistration};

// Re-export implementations
pub use artifact::MemoryArtifactStore;
pub use build::MemoryBuildRunner;
pub use deploy::{DeployedStack, MemoryDeployService};
pub use identity::MemoryIdentityService;
pub use source::{MemorySourceConnection, snapshot_from_dir};

/// Result type alias for collaborator calls
pub type Result<T> = std::result::Result<T, CollaboratorError>;

/// The set of collaborators a pipeline is wired against
///
/// Passed explicitly to the factory and the sequencer.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn SourceConnection>,
    pub build: Arc<dyn BuildRunner>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub deploy: Arc<dyn DeployService>,
    pub identity: Arc<dyn IdentityService>,
}
