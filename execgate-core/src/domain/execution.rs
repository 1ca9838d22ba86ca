//! Execution domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{JobResult, Language, ResourceMetrics};

/// Request handed to the execution engine for one dispatch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRequest {
    pub job_id: Uuid,
    pub code_key: String,
    pub language: Language,
    pub input: String,
    pub timeout_ms: u64,
}

/// Record of one execution attempt
///
/// A job may accumulate several of these; the most recent one is
/// authoritative for the job's displayed output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRecord {
    pub execution_id: Uuid,
    pub job_id: Uuid,
    pub stdout: String,
    pub stderr: String,
    pub log_key: Option<String>,
    pub logs_url: Option<String>,
    pub error_message: Option<String>,
    pub resource: ResourceMetrics,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl ExecutionRecord {
    /// Builds an attempt record from the result attached to a job
    pub fn from_result(job_id: Uuid, result: &JobResult) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            job_id,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            log_key: result.log_key.clone(),
            logs_url: result.logs_url.clone(),
            error_message: result.error_message.clone(),
            resource: result.resource.unwrap_or_default(),
            completed_at: chrono::Utc::now(),
        }
    }
}
