//! Pipeline DTOs

use serde::{Deserialize, Serialize};

use crate::build::BuildStageDefinition;
use crate::domain::identity::IdentityHandle;
use crate::domain::permission::PermissionGrant;
use crate::domain::spec::PipelineSpec;
use crate::domain::stage::Stage;
use crate::domain::trigger::TriggerFilter;

/// Persisted configuration of one pipeline
///
/// Everything else (resource names, permission scopes, trigger filter) is
/// derived from these three fields and the shared artifact location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub repository: String,
    pub branch: String,
    pub project_name: String,
}

impl PipelineRecord {
    pub fn into_spec(self, artifact_location_name: impl Into<String>) -> PipelineSpec {
        PipelineSpec {
            repository: self.repository,
            branch: self.branch,
            project_name: self.project_name,
            artifact_location_name: artifact_location_name.into(),
        }
    }
}

/// Summary information about a defined pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub project_name: String,
    pub pipeline_name: String,
    pub repository: String,
    pub branch: String,
    pub artifact_location: String,
}

/// Full wiring of a defined pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDetail {
    #[serde(flatten)]
    pub summary: PipelineSummary,
    pub identity: IdentityHandle,
    pub build: BuildStageDefinition,
    pub trigger: TriggerFilter,
    pub stages: Vec<Stage>,
    pub grants: Vec<PermissionGrant>,
}
