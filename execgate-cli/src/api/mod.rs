//! API client module
//!
//! HTTP client for communicating with the Execgate gateway API.

use anyhow::{Context, Result};
use execgate_core::domain::project::Project;
use execgate_core::dto::job::{CancelResponse, JobResponse, UploadCode};
use reqwest::Client;
use uuid::Uuid;

/// HTTP client for the Execgate gateway API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the gateway
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Upload code and create a job
    ///
    /// # Arguments
    /// * `req` - The upload request
    ///
    /// # Returns
    /// The created job, still pending
    pub async fn upload(&self, req: &UploadCode) -> Result<JobResponse> {
        let url = format!("{}/api/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .context("Failed to send upload request")?;

        self.handle_response(response).await
    }

    /// Dispatch a job to the execution engine
    ///
    /// # Arguments
    /// * `id` - The job UUID
    /// * `input` - Optional input passed to the program
    pub async fn execute(&self, id: Uuid, input: Option<&str>) -> Result<JobResponse> {
        let url = format!("{}/api/execute/{}", self.base_url, id);
        let mut request = self.client.post(&url);
        if let Some(input) = input {
            request = request.query(&[("input", input)]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send execute request")?;

        self.handle_response(response).await
    }

    /// Get the reconciled status of a job
    pub async fn status(&self, id: Uuid) -> Result<JobResponse> {
        let url = format!("{}/api/status/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send status request")?;

        self.handle_response(response).await
    }

    /// Get the stored job record
    pub async fn get_job(&self, id: Uuid) -> Result<JobResponse> {
        let url = format!("{}/api/jobs/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get job request")?;

        self.handle_response(response).await
    }

    /// Cancel a job
    pub async fn cancel(&self, id: Uuid) -> Result<CancelResponse> {
        let url = format!("{}/api/cancel/{}", self.base_url, id);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send cancel request")?;

        self.handle_response(response).await
    }

    /// List jobs, newest first
    ///
    /// # Arguments
    /// * `project` - Restrict the listing to one project
    /// * `limit` - Maximum number of jobs returned
    pub async fn list_jobs(&self, project: Option<&str>, limit: Option<i64>) -> Result<Vec<JobResponse>> {
        let url = match project {
            Some(project) => format!("{}/api/projects/{}/jobs", self.base_url, project),
            None => format!("{}/api/jobs", self.base_url),
        };

        let mut request = self.client.get(&url);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send list jobs request")?;

        self.handle_response(response).await
    }

    /// List all projects
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let url = format!("{}/api/projects", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send list projects request")?;

        self.handle_response(response).await
    }

    /// Handle API response and deserialize JSON
    ///
    /// Error bodies of the form `{"error": "..."}` are unwrapped into the
    /// message.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&error_text)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or(error_text);
            anyhow::bail!("Request failed with status {}: {}", status, message);
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }
}
