//! Engine run, status and cancel endpoints

use async_trait::async_trait;
use execgate_core::domain::execution::ExecutionRequest;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::payload::{RunPayload, StatusPayload};
use crate::{EngineClient, ExecutionEngine};

#[async_trait]
impl ExecutionEngine for EngineClient {
    /// Run a stored code artifact
    ///
    /// Calls `GET {engine}/{language}/run` with the code key, job id and time
    /// budget as query parameters and validates the returned payload.
    async fn run(&self, request: &ExecutionRequest) -> Result<RunPayload> {
        let url = format!("{}/{}/run", self.base_url, request.language);

        let job_id = request.job_id.to_string();
        let timeout_ms = request.timeout_ms.to_string();
        let mut query = vec![
            ("code_key", request.code_key.as_str()),
            ("job_id", job_id.as_str()),
            ("timeout_ms", timeout_ms.as_str()),
        ];
        if !request.input.is_empty() {
            query.push(("input", request.input.as_str()));
        }

        debug!("Submitting job {} to {}", request.job_id, url);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| EngineError::from_transport(e, self.timeout))?;

        let body = self.read_body(response).await?;
        RunPayload::parse(&body)
    }

    /// Query the engine's status for a job
    async fn status(&self, job_id: Uuid) -> Result<Option<StatusPayload>> {
        let url = format!("{}/status/{}", self.base_url, job_id);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| EngineError::from_transport(e, self.timeout))?;

        let body = self.read_body(response).await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }

        serde_json::from_str(body)
            .map(Some)
            .map_err(|e| EngineError::MalformedResponse(e.to_string()))
    }

    /// Ask the engine to stop a job
    async fn cancel(&self, job_id: Uuid) -> Result<()> {
        let url = format!("{}/cancel/{}", self.base_url, job_id);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| EngineError::from_transport(e, self.timeout))?;

        self.expect_success(response).await
    }
}
