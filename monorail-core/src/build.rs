//! Build stage definition
//!
//! Declares the isolated build environment of one project. Each project gets
//! its own build definition; only the artifact location is shared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::artifact::ArtifactLocationHandle;
use crate::domain::spec::project_dir;

/// Environment variable exposing the artifact location to the build
pub const ARTIFACT_LOCATION_ENV: &str = "ARTIFACT_BUCKET_NAME";

/// Build specification file name inside a project directory
pub const BUILD_SPEC_FILE: &str = "buildspec.yml";

pub const DEFAULT_BUILD_IMAGE: &str = "standard-linux:5.0";

/// Build environment of a single project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStageDefinition {
    pub project_name: String,
    pub build_project_name: String,

    /// Builds may start their own containers, so they run privileged
    pub privileged: bool,

    pub image: String,
    pub environment_variables: BTreeMap<String, String>,

    /// Repository-relative path of the build specification
    pub build_spec_path: String,
}

impl BuildStageDefinition {
    /// Defines the build stage of `project_name`
    ///
    /// The build spec path follows the `projects/<project>/buildspec.yml`
    /// convention. Its existence is only checked by the build runner when
    /// the build executes.
    pub fn define(project_name: &str, artifact_location: &ArtifactLocationHandle) -> Self {
        Self {
            project_name: project_name.to_string(),
            build_project_name: format!("{}-build", project_name),
            privileged: true,
            image: DEFAULT_BUILD_IMAGE.to_string(),
            environment_variables: BTreeMap::from([(
                ARTIFACT_LOCATION_ENV.to_string(),
                artifact_location.name.clone(),
            )]),
            build_spec_path: format!("{}/{}", project_dir(project_name), BUILD_SPEC_FILE),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define() {
        let location = ArtifactLocationHandle::new("monorail-artifacts");
        let build = BuildStageDefinition::define("lambda-project-foo", &location);

        assert!(build.privileged);
        assert_eq!(build.build_project_name, "lambda-project-foo-build");
        assert_eq!(
            build.build_spec_path,
            "projects/lambda-project-foo/buildspec.yml"
        );
        assert_eq!(build.environment_variables.len(), 1);
        assert_eq!(
            build.environment_variables.get(ARTIFACT_LOCATION_ENV),
            Some(&"monorail-artifacts".to_string())
        );
        assert_eq!(build.image, DEFAULT_BUILD_IMAGE);
    }

    #[test]
    fn test_with_image() {
        let location = ArtifactLocationHandle::new("a");
        let build = BuildStageDefinition::define("p", &location).with_image("custom:1");
        assert_eq!(build.image, "custom:1");
    }
}
