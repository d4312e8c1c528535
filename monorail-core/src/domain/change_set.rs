//! Change set domain types

use serde::{Deserialize, Serialize};

/// Name of the change set, reused across a pipeline's lifetime
pub const CHANGE_SET_NAME: &str = "deploy-change-set";

/// Path of the deploy template inside the build output
pub const TEMPLATE_PATH: &str = "build.yml";

/// A planned, not yet executed, set of deploy changes
///
/// Created fresh by every Deploy-plan (replacing the previous change set of the
/// same name) and executed exactly once by Deploy-apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Identifier returned by the deploy service for this plan
    pub id: String,
    pub change_set_name: String,
    pub stack_name: String,
    pub template_path: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
