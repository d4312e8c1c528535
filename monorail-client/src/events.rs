//! Change event API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use monorail_core::domain::trigger::{ChangeEvent, TriggerDecision};
use monorail_core::dto::event::{DispatchResult, TriggerCheck};

impl OrchestratorClient {
    // =============================================================================
    // Change Events
    // =============================================================================

    /// Dispatch a change event
    ///
    /// Returns the runs queued on the pipelines the event triggered, and the
    /// triggered pipelines whose queue was full. An event that triggers
    /// nothing is not an error.
    pub async fn send_event(&self, event: &ChangeEvent) -> Result<DispatchResult> {
        let response = self
            .client
            .post(self.url("/event"))
            .json(event)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Evaluate a change event against one pipeline without running it
    pub async fn check_trigger(
        &self,
        project_name: &str,
        event: ChangeEvent,
    ) -> Result<TriggerDecision> {
        let req = TriggerCheck {
            project_name: project_name.to_string(),
            event,
        };
        let response = self
            .client
            .post(self.url("/event/check"))
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
