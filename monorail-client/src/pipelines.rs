//! Pipeline-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use monorail_core::dto::pipeline::{PipelineDetail, PipelineRecord, PipelineSummary};
use monorail_core::dto::run::RunSummary;

impl OrchestratorClient {
    // =============================================================================
    // Pipeline Management
    // =============================================================================

    /// Define a pipeline for a project
    ///
    /// Fails with status 400 if the record is malformed or the project already
    /// has a pipeline, 404 if the artifact location does not exist.
    ///
    /// # Example
    /// ```no_run
    /// # use monorail_client::OrchestratorClient;
    /// # use monorail_core::dto::pipeline::PipelineRecord;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// let pipeline = client.create_pipeline(PipelineRecord {
    ///     repository: "acme/monorepo".to_string(),
    ///     branch: "main".to_string(),
    ///     project_name: "lambda-project-foo".to_string(),
    /// }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_pipeline(&self, record: PipelineRecord) -> Result<PipelineDetail> {
        let response = self
            .client
            .post(self.url("/pipeline/create"))
            .json(&record)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List all pipelines
    pub async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        let response = self.client.get(self.url("/pipeline/list")).send().await?;

        self.handle_response(response).await
    }

    /// Get a pipeline's stages, trigger filter and grants
    pub async fn get_pipeline(&self, project_name: &str) -> Result<PipelineDetail> {
        let url = self.url(&format!("/pipeline/{}", project_name));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List the runs of a pipeline, oldest first
    pub async fn list_runs(&self, project_name: &str) -> Result<Vec<RunSummary>> {
        let url = self.url(&format!("/pipeline/{}/runs", project_name));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
