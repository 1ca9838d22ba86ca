//! Job DTOs for the gateway HTTP API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::execution::ExecutionRecord;
use crate::domain::job::{Job, JobResult, JobStatus, Language, ResourceMetrics};

/// Request to upload code and create a job
///
/// `language` stays a plain string so an unsupported value reaches the
/// server's validation and is answered with a client error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCode {
    pub project: String,
    pub code: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Job view returned by every job endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub project: String,
    pub code_key: String,
    pub language: Language,
    pub status: JobStatus,
    pub message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub timeout_ms: u64,
    pub result: Option<JobResult>,
    pub resource: Option<ResourceMetrics>,
    pub log_key: Option<String>,
    pub logs_url: Option<String>,
}

impl JobResponse {
    /// Builds a response from a job, defaulting the message to its status
    pub fn from_job(job: Job, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| format!("Job status: {}", job.status));
        let resource = job.result.as_ref().and_then(|r| r.resource);
        let log_key = job.result.as_ref().and_then(|r| r.log_key.clone());
        let logs_url = job.result.as_ref().and_then(|r| r.logs_url.clone());

        Self {
            job_id: job.job_id,
            project: job.project,
            code_key: job.code_key,
            language: job.language,
            status: job.status,
            message,
            created_at: job.created_at,
            updated_at: job.updated_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            timeout_ms: job.timeout_ms,
            result: job.result,
            resource,
            log_key,
            logs_url,
        }
    }

    /// Fills log reference and resource metrics from the latest execution
    /// attempt where the job's own result does not carry them
    pub fn with_execution(mut self, execution: Option<&ExecutionRecord>) -> Self {
        if let Some(execution) = execution {
            if self.log_key.is_none() {
                self.log_key = execution.log_key.clone();
            }
            if self.logs_url.is_none() {
                self.logs_url = execution.logs_url.clone();
            }
            if self.resource.is_none() && !execution.resource.is_empty() {
                self.resource = Some(execution.resource);
            }
        }
        self
    }
}

/// Response to a cancellation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    #[serde(flatten)]
    pub job: JobResponse,
    /// Whether the execution engine acknowledged the remote stop
    pub engine_acknowledged: bool,
}

/// Query parameters of the job listing endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<i64>,
}

/// Query parameters of the execute endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteQuery {
    pub input: Option<String>,
}
