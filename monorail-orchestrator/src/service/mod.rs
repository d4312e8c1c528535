//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services wire pipelines against the collaborators and drive their runs.

pub mod artifact;
pub mod factory;
pub mod history;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod sequencer;

// Re-export for convenience
pub use artifact::ArtifactStoreBinding;
pub use factory::PipelineFactory;
pub use history::RunHistory;
pub use orchestrator::Orchestrator;
pub use pipeline::Pipeline;
pub use registry::PipelineRegistry;
pub use sequencer::Sequencer;
