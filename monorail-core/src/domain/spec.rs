//! Pipeline spec domain types
//!
//! A [`PipelineSpec`] is the whole persisted identity of a pipeline. Every
//! resource name, permission scope and trigger filter is derived from it.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Directory of the monorepo holding one sub-directory per project
pub const PROJECTS_DIR: &str = "projects";

const MAX_PROJECT_NAME_LEN: usize = 64;

/// Identity of one orchestrated pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Source repository as `<owner>/<repo>`
    pub repository: String,

    /// Branch whose changes trigger this pipeline
    pub branch: String,

    /// Sub-project directory name, unique among defined pipelines
    pub project_name: String,

    /// Name of the shared artifact location
    pub artifact_location_name: String,
}

impl PipelineSpec {
    pub fn new(
        repository: impl Into<String>,
        branch: impl Into<String>,
        project_name: impl Into<String>,
        artifact_location_name: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            branch: branch.into(),
            project_name: project_name.into(),
            artifact_location_name: artifact_location_name.into(),
        }
    }

    /// Validates every field the derived names depend on
    pub fn validate(&self) -> Result<()> {
        validate_project_name(&self.project_name)?;
        self.repository_parts()?;

        if self.branch.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "branch cannot be empty".to_string(),
            ));
        }

        if self.artifact_location_name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "artifact location name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Splits `repository` into `(owner, repo)`
    pub fn repository_parts(&self) -> Result<(&str, &str)> {
        match self.repository.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok((owner, repo))
            }
            _ => Err(PipelineError::Configuration(format!(
                "repository '{}' must have the form <owner>/<repo>",
                self.repository
            ))),
        }
    }

    pub fn pipeline_name(&self) -> String {
        format!("{}-pipeline", self.project_name)
    }

    pub fn build_project_name(&self) -> String {
        format!("{}-build", self.project_name)
    }

    pub fn identity_name(&self) -> String {
        format!("{}-role", self.pipeline_name())
    }

    /// The deploy stack is named after the project
    pub fn stack_name(&self) -> &str {
        &self.project_name
    }

    pub fn project_dir(&self) -> String {
        project_dir(&self.project_name)
    }
}

/// Repository-relative directory of a project, e.g. `projects/lambda-project-foo`
pub fn project_dir(project_name: &str) -> String {
    format!("{}/{}", PROJECTS_DIR, project_name)
}

/// Checks that a project name is safe to embed in paths and resource scopes
pub fn validate_project_name(project_name: &str) -> Result<()> {
    if project_name.is_empty() {
        return Err(PipelineError::Configuration(
            "project name cannot be empty".to_string(),
        ));
    }

    if project_name.len() > MAX_PROJECT_NAME_LEN {
        return Err(PipelineError::Configuration(format!(
            "project name is too long (max {} characters)",
            MAX_PROJECT_NAME_LEN
        )));
    }

    if let Some(c) = project_name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(PipelineError::Configuration(format!(
            "project name '{}' contains invalid character '{}'",
            project_name, c
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(project: &str) -> PipelineSpec {
        PipelineSpec::new(
            "acme/monorepo",
            "main",
            project,
            "monorail-artifacts",
        )
    }

    #[test]
    fn test_derived_names() {
        let spec = spec("lambda-project-foo");
        assert_eq!(spec.pipeline_name(), "lambda-project-foo-pipeline");
        assert_eq!(spec.build_project_name(), "lambda-project-foo-build");
        assert_eq!(spec.identity_name(), "lambda-project-foo-pipeline-role");
        assert_eq!(spec.stack_name(), "lambda-project-foo");
        assert_eq!(spec.project_dir(), "projects/lambda-project-foo");
    }

    #[test]
    fn test_repository_parts() {
        assert_eq!(
            spec("foo").repository_parts().unwrap(),
            ("acme", "monorepo")
        );

        for bad in ["monorepo", "/monorepo", "acme/", "a/b/c"] {
            let mut spec = spec("foo");
            spec.repository = bad.to_string();
            assert!(spec.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("lambda-project_foo1").is_ok());
        assert!(validate_project_name("").is_err());
        assert!(validate_project_name("../escape").is_err());
        assert!(validate_project_name("with space").is_err());
        assert!(validate_project_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_empty_branch() {
        let mut spec = spec("foo");
        spec.branch = " ".to_string();
        assert!(matches!(
            spec.validate(),
            Err(PipelineError::Configuration(_))
        ));
    }
}
