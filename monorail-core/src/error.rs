//! Error types shared across Monorail crates

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while defining or running a pipeline
///
/// `NotFound` and `Configuration` abort pipeline construction. `StageFailure`
/// and `PermissionDenied` abort the current run only.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A referenced resource (artifact store, build spec, pipeline, run) does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input or a clash between pipeline definitions
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stage's collaborator reported failure
    #[error("stage '{stage}' failed: {source}")]
    StageFailure {
        /// Name of the failing stage action
        stage: String,
        /// Error reported by the collaborator
        #[source]
        source: CollaboratorError,
    },

    /// The identity/permission system rejected an action
    #[error("permission denied: {action} on {resource}")]
    PermissionDenied { action: String, resource: String },

    /// A collaborator failed outside of a stage (e.g. while wiring a pipeline)
    #[error("collaborator error: {0}")]
    Collaborator(CollaboratorError),

    /// The run queue of a pipeline no longer accepts events
    #[error("run queue for '{0}' is closed")]
    QueueClosed(String),

    /// The run queue of a pipeline is at capacity
    #[error("run queue for '{0}' is full")]
    QueueFull(String),
}

impl PipelineError {
    /// Wraps a collaborator error as the failure of a named stage action
    ///
    /// Permission rejections keep their own variant so they are never
    /// mistaken for an ordinary stage failure.
    pub fn stage(stage: impl Into<String>, source: CollaboratorError) -> Self {
        match source {
            CollaboratorError::PermissionDenied { action, resource } => {
                PipelineError::PermissionDenied { action, resource }
            }
            source => PipelineError::StageFailure {
                stage: stage.into(),
                source,
            },
        }
    }
}

impl From<CollaboratorError> for PipelineError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::NotFound(msg) => PipelineError::NotFound(msg),
            CollaboratorError::Configuration(msg) => PipelineError::Configuration(msg),
            CollaboratorError::PermissionDenied { action, resource } => {
                PipelineError::PermissionDenied { action, resource }
            }
            other => PipelineError::Collaborator(other),
        }
    }
}

/// Errors reported by external collaborators (source connection, build runner,
/// artifact store, deploy service, identity system)
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("permission denied: {action} on {resource}")]
    PermissionDenied { action: String, resource: String },

    #[error("{0}")]
    Failed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
