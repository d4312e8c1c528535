//! Orchestrator configuration
//!
//! Settings come from `MONORAIL_*` environment variables. Pipeline records are
//! read from the JSON file named by `MONORAIL_PIPELINES_FILE`.

use anyhow::Context;
use monorail_core::dto::pipeline::PipelineRecord;
use std::path::{Path, PathBuf};

use crate::scheduler::DEFAULT_QUEUE_CAPACITY;
use crate::service::history::DEFAULT_HISTORY_LIMIT;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ARTIFACT_LOCATION: &str = "monorail-artifacts";
const DEFAULT_CONNECTION_REF: &str = "connection:local";

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// Name of the pre-existing artifact location shared by every pipeline
    pub artifact_location: String,

    /// Source connection every pipeline fetches through
    pub connection_ref: String,

    /// JSON file holding the pipeline records to define at startup
    pub pipelines_file: Option<PathBuf>,

    /// Working tree served as the head of every pipeline's branch in local mode
    pub source_root: Option<PathBuf>,

    /// Pending runs a pipeline queues before further events are skipped
    pub run_queue_capacity: usize,

    /// Runs kept per pipeline in the run history
    pub run_history_limit: usize,

    /// Build image override; the core default applies when unset
    pub build_image: Option<String>,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - MONORAIL_CONNECTION_REF (required)
    /// - MONORAIL_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - MONORAIL_ARTIFACT_STORE (optional, default: monorail-artifacts)
    /// - MONORAIL_PIPELINES_FILE (optional)
    /// - MONORAIL_SOURCE_ROOT (optional)
    /// - MONORAIL_RUN_QUEUE_CAPACITY (optional, default: 32)
    /// - MONORAIL_RUN_HISTORY_LIMIT (optional, default: 50)
    /// - MONORAIL_BUILD_IMAGE (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        let connection_ref = std::env::var("MONORAIL_CONNECTION_REF")
            .map_err(|_| anyhow::anyhow!("MONORAIL_CONNECTION_REF environment variable not set"))?;

        let bind_addr =
            std::env::var("MONORAIL_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let artifact_location = std::env::var("MONORAIL_ARTIFACT_STORE")
            .unwrap_or_else(|_| DEFAULT_ARTIFACT_LOCATION.to_string());

        let pipelines_file = std::env::var("MONORAIL_PIPELINES_FILE")
            .ok()
            .map(PathBuf::from);

        let source_root = std::env::var("MONORAIL_SOURCE_ROOT").ok().map(PathBuf::from);

        let run_queue_capacity = std::env::var("MONORAIL_RUN_QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        let run_history_limit = std::env::var("MONORAIL_RUN_HISTORY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        let build_image = std::env::var("MONORAIL_BUILD_IMAGE").ok();

        Ok(Self {
            bind_addr,
            artifact_location,
            connection_ref,
            pipelines_file,
            source_root,
            run_queue_capacity,
            run_history_limit,
            build_image,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.artifact_location.trim().is_empty() {
            anyhow::bail!("artifact_location cannot be empty");
        }

        if self.connection_ref.trim().is_empty() {
            anyhow::bail!("connection_ref cannot be empty");
        }

        if self.run_queue_capacity == 0 {
            anyhow::bail!("run_queue_capacity must be greater than 0");
        }

        if self.run_history_limit == 0 {
            anyhow::bail!("run_history_limit must be greater than 0");
        }

        if self
            .build_image
            .as_deref()
            .is_some_and(|image| image.trim().is_empty())
        {
            anyhow::bail!("build_image cannot be empty when set");
        }

        Ok(())
    }

    /// Reads the pipeline records to define at startup
    ///
    /// Returns no records when no pipelines file is configured.
    pub fn load_pipelines(&self) -> anyhow::Result<Vec<PipelineRecord>> {
        match &self.pipelines_file {
            Some(path) => read_pipelines_file(path),
            None => Ok(Vec::new()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            artifact_location: DEFAULT_ARTIFACT_LOCATION.to_string(),
            connection_ref: DEFAULT_CONNECTION_REF.to_string(),
            pipelines_file: None,
            source_root: None,
            run_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            run_history_limit: DEFAULT_HISTORY_LIMIT,
            build_image: None,
        }
    }
}

/// Parses a JSON array of pipeline records
pub fn read_pipelines_file(path: &Path) -> anyhow::Result<Vec<PipelineRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipelines file {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse pipelines file {}", path.display()))
}
