//! Run-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use monorail_core::domain::run::PipelineRun;
use uuid::Uuid;

impl OrchestratorClient {
    /// Get a run with its stage records, artifacts and change set
    pub async fn get_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        let url = self.url(&format!("/run/{}", run_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
