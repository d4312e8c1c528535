//! Pipeline Factory
//!
//! Wires one pipeline per project. The factory holds no registry of what it
//! has built: two `create` calls for the same project yield independent
//! pipelines that only share the artifact location.

use monorail_core::build::BuildStageDefinition;
use monorail_core::domain::identity::ConnectionHandle;
use monorail_core::domain::permission::ResourceScope;
use monorail_core::domain::spec::PipelineSpec;
use monorail_core::domain::trigger::TriggerFilter;
use monorail_core::{Result, policy};

use super::artifact::ArtifactStoreBinding;
use super::pipeline::{Pipeline, assemble_stages};
use crate::collaborator::{Collaborators, TriggerRegistration};

/// Builds immutable pipelines against a set of collaborators
pub struct PipelineFactory {
    collaborators: Collaborators,
    artifacts: ArtifactStoreBinding,
    connection: ConnectionHandle,
    build_image: Option<String>,
}

impl PipelineFactory {
    pub fn new(collaborators: Collaborators, connection: ConnectionHandle) -> Self {
        Self {
            artifacts: ArtifactStoreBinding::new(collaborators.artifacts.clone()),
            collaborators,
            connection,
            build_image: None,
        }
    }

    /// Overrides the build image of every pipeline created afterwards
    pub fn with_build_image(mut self, image: impl Into<String>) -> Self {
        self.build_image = Some(image.into());
        self
    }

    /// Creates a pipeline for `spec`
    ///
    /// Everything derivable without a collaborator is validated first, so a
    /// malformed spec never creates an identity or registers a trigger.
    pub async fn create(&self, spec: PipelineSpec) -> Result<Pipeline> {
        spec.validate()?;

        let location = self.artifacts.resolve(&spec.artifact_location_name).await?;

        let mut build = BuildStageDefinition::define(&spec.project_name, &location);
        if let Some(image) = &self.build_image {
            build = build.with_image(image.clone());
        }

        let trigger = TriggerFilter::for_project(&spec.project_name, &spec.branch);
        let stages = assemble_stages(&spec, &build)?;

        let function_scope = ResourceScope::new(policy::function_namespace(&spec.project_name));
        let grants = policy::build_with_scope(&location, &self.connection, &function_scope);

        let identity = self
            .collaborators
            .identity
            .create_identity(&spec.identity_name())
            .await?;
        self.collaborators
            .identity
            .attach(&identity, &grants)
            .await?;

        self.collaborators
            .source
            .register_trigger(
                &self.connection,
                TriggerRegistration::from_filter(spec.pipeline_name(), &trigger),
            )
            .await?;

        tracing::info!(
            "Pipeline created: {} (identity {})",
            spec.pipeline_name(),
            identity.id
        );

        Ok(Pipeline {
            spec,
            location,
            connection: self.connection.clone(),
            identity,
            build,
            trigger,
            stages,
            function_scope,
        })
    }
}
