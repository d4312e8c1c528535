//! Build runner collaborator

use async_trait::async_trait;
use monorail_core::domain::artifact::FileMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

use super::{CollaboratorError, Result};

/// Everything the build runner needs to execute one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub build_project_name: String,
    pub build_spec_path: String,
    pub environment_variables: BTreeMap<String, String>,
    pub privileged: bool,
    pub image: String,
    /// Contents of the input artifact
    pub input: FileMap,
}

/// Collaborator trait for the build execution environment
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Runs a build and returns the contents of its output artifact
    ///
    /// Returns `Configuration` if the build specification is missing from
    /// the input artifact.
    async fn run(&self, request: &BuildRequest) -> Result<FileMap>;
}

/// In-memory implementation of BuildRunner
///
/// Does not execute the build spec. After checking that the spec exists it
/// emits the files of the project directory, with the directory prefix
/// stripped, as the build output. Only the most recent
/// [`RECORDED_REQUESTS`] requests are kept for inspection.
#[derive(Default)]
pub struct MemoryBuildRunner {
    requests: RwLock<VecDeque<BuildRequest>>,
}

/// Number of build requests a [`MemoryBuildRunner`] remembers
pub const RECORDED_REQUESTS: usize = 32;

impl MemoryBuildRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent builds received, oldest first
    pub async fn requests(&self) -> Vec<BuildRequest> {
        self.requests.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl BuildRunner for MemoryBuildRunner {
    async fn run(&self, request: &BuildRequest) -> Result<FileMap> {
        {
            let mut requests = self.requests.write().await;
            if requests.len() == RECORDED_REQUESTS {
                requests.pop_front();
            }
            requests.push_back(request.clone());
        }

        if !request.input.contains_key(&request.build_spec_path) {
            return Err(CollaboratorError::Configuration(format!(
                "no build specification at '{}'",
                request.build_spec_path
            )));
        }

        let project_dir = match request.build_spec_path.rsplit_once('/') {
            Some((dir, _)) => format!("{}/", dir),
            None => String::new(),
        };

        let output: FileMap = request
            .input
            .iter()
            .filter_map(|(path, contents)| {
                path.strip_prefix(&project_dir)
                    .map(|relative| (relative.to_string(), contents.clone()))
            })
            .collect();

        debug!(
            "Build {} produced {} files",
            request.build_project_name,
            output.len()
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(input: FileMap) -> BuildRequest {
        BuildRequest {
            build_project_name: "foo-build".to_string(),
            build_spec_path: "projects/foo/buildspec.yml".to_string(),
            environment_variables: BTreeMap::new(),
            privileged: true,
            image: "standard-linux:5.0".to_string(),
            input,
        }
    }

    #[tokio::test]
    async fn test_missing_build_spec() {
        let runner = MemoryBuildRunner::new();
        let err = runner.run(&request(FileMap::new())).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Configuration(_)));
        assert_eq!(runner.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_output_is_project_directory() {
        let mut input = FileMap::new();
        input.insert("projects/foo/buildspec.yml".to_string(), b"version: 0.2".to_vec());
        input.insert("projects/foo/build.yml".to_string(), b"Resources: {}".to_vec());
        input.insert("projects/foo/handler.zip".to_string(), vec![0x50, 0x4b, 0xff, 0x00]);
        input.insert("projects/foobar/build.yml".to_string(), b"other".to_vec());
        input.insert("README.md".to_string(), b"# monorepo".to_vec());

        let output = MemoryBuildRunner::new().run(&request(input)).await.unwrap();

        assert_eq!(output.len(), 3);
        assert_eq!(output.get("build.yml"), Some(&b"Resources: {}".to_vec()));
        assert_eq!(output.get("handler.zip"), Some(&vec![0x50, 0x4b, 0xff, 0x00]));
        assert!(output.contains_key("buildspec.yml"));
    }

    #[tokio::test]
    async fn test_recorded_requests_are_bounded() {
        let runner = MemoryBuildRunner::new();
        for n in 0..RECORDED_REQUESTS + 5 {
            let mut req = request(FileMap::new());
            req.build_project_name = format!("build-{}", n);
            let _ = runner.run(&req).await;
        }

        let requests = runner.requests().await;
        assert_eq!(requests.len(), RECORDED_REQUESTS);
        assert_eq!(requests[0].build_project_name, "build-5");
        assert_eq!(
            requests[RECORDED_REQUESTS - 1].build_project_name,
            format!("build-{}", RECORDED_REQUESTS + 4)
        );
    }
}
