//! Execgate Execution Engine Client
//!
//! A type-safe HTTP client for the remote execution engine that actually
//! runs uploaded code.
//!
//! The gateway only needs three things from the engine: run a stored code
//! artifact, report the status of a job, and stop a job. Those are captured by
//! the [`ExecutionEngine`] trait so orchestration code can be exercised
//! against stub engines; [`EngineClient`] is the HTTP implementation.
//!
//! # Example
//!
//! ```no_run
//! use execgate_core::domain::execution::ExecutionRequest;
//! use execgate_core::domain::job::Language;
//! use execgate_engine::{EngineClient, ExecutionEngine};
//! use std::time::Duration;
//!
//! # async fn example() -> execgate_engine::Result<()> {
//! let engine = EngineClient::new("http://localhost:9000", Duration::from_secs(30));
//!
//! let payload = engine
//!     .run(&ExecutionRequest {
//!         job_id: uuid::Uuid::new_v4(),
//!         code_key: "python/hello.py".to_string(),
//!         language: Language::Python,
//!         input: String::new(),
//!         timeout_ms: 5000,
//!     })
//!     .await?;
//!
//! println!("stdout: {}", payload.stdout);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod payload;
mod runs;

// Re-export commonly used types
pub use error::{EngineError, Result};
pub use payload::{RunPayload, StatusPayload};

use async_trait::async_trait;
use execgate_core::domain::execution::ExecutionRequest;
use reqwest::Client;
use std::time::Duration;
use uuid::Uuid;

/// Operations the gateway needs from an execution engine
///
/// Every call is a suspending network call bounded by a timeout; failures are
/// reported as [`EngineError`] and never panic.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Runs a stored code artifact and returns the validated result payload
    async fn run(&self, request: &ExecutionRequest) -> Result<RunPayload>;

    /// Queries the engine's view of a job
    ///
    /// Returns `Ok(None)` when the engine answered without any status body.
    async fn status(&self, job_id: Uuid) -> Result<Option<StatusPayload>>;

    /// Asks the engine to stop a job
    async fn cancel(&self, job_id: Uuid) -> Result<()>;
}

/// HTTP client for the execution engine API
#[derive(Debug, Clone)]
pub struct EngineClient {
    /// Base URL of the engine (e.g., "http://localhost:9000")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Upper bound applied to every engine call
    timeout: Duration,
}

impl EngineClient {
    /// Create a new engine client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the engine API (e.g., "http://localhost:9000")
    /// * `timeout` - Upper bound for each submit, status and cancel call
    ///
    /// # Example
    /// ```
    /// use execgate_engine::EngineClient;
    /// use std::time::Duration;
    ///
    /// let client = EngineClient::new("http://localhost:9000", Duration::from_secs(30));
    /// ```
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(base_url, Client::new(), timeout)
    }

    /// Create a new engine client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, connection pools, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client, timeout: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
        }
    }

    /// Get the base URL of the engine
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and return the response body as text
    async fn read_body(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EngineError::status(status.as_u16(), error_text));
        }

        response
            .text()
            .await
            .map_err(|e| EngineError::from_transport(e, self.timeout))
    }

    /// Check the status code of a response whose body is ignored
    async fn expect_success(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EngineError::status(status.as_u16(), error_text));
        }

        Ok(())
    }
}
