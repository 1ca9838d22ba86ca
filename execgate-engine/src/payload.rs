//! Engine response contracts
//!
//! The run endpoint's payload is validated strictly: the body must be a JSON
//! object whose keys and value types match [`RunPayload`]. Anything else is a
//! [`EngineError::MalformedResponse`]. The status endpoint is read more
//! leniently since a bad status answer only means "no remote information".

use execgate_core::domain::job::{JobResult, JobStatus, ResourceMetrics};
use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Payload returned by `GET {engine}/{language}/run`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunPayload {
    pub stdout: String,
    pub stderr: String,
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    pub execution_time_ms: Option<f64>,
    pub log_key: Option<String>,
    pub logs_url: Option<String>,
    pub code_key: Option<String>,
    pub job_id: Option<String>,
    pub status: Option<String>,
    pub error_message: Option<String>,
}

impl RunPayload {
    /// Parses and validates a raw run response body
    pub fn parse(body: &str) -> Result<Self> {
        let text = body.trim();
        if !(text.starts_with('{') && text.ends_with('}')) {
            return Err(EngineError::MalformedResponse(
                "response body is not a JSON object".to_string(),
            ));
        }

        let payload: RunPayload = serde_json::from_str(text)
            .map_err(|e| EngineError::MalformedResponse(e.to_string()))?;

        // Validate the reported outcome up front so callers can rely on it
        payload.outcome()?;

        Ok(payload)
    }

    /// Terminal state the engine reports for this run
    ///
    /// A missing status means the run completed. `COMPLETED` is accepted as
    /// an alias of `SUCCESS`; states other than SUCCESS, FAILED and TIMEOUT
    /// are not valid outcomes of a finished run.
    pub fn outcome(&self) -> Result<JobStatus> {
        let Some(raw) = self.status.as_deref() else {
            return Ok(JobStatus::Success);
        };

        match parse_engine_status(raw) {
            Some(status @ (JobStatus::Success | JobStatus::Failed | JobStatus::Timeout)) => {
                Ok(status)
            }
            _ => Err(EngineError::MalformedResponse(format!(
                "unexpected run status: {}",
                raw
            ))),
        }
    }

    pub fn resource(&self) -> Option<ResourceMetrics> {
        let metrics = ResourceMetrics {
            cpu_percent: self.cpu_percent,
            memory_mb: self.memory_mb,
            execution_time_ms: self.execution_time_ms,
        };
        (!metrics.is_empty()).then_some(metrics)
    }

    /// Converts the payload into the result attached to the job
    pub fn into_result(self) -> JobResult {
        let resource = self.resource();
        JobResult {
            stdout: self.stdout,
            stderr: self.stderr,
            resource,
            log_key: self.log_key,
            logs_url: self.logs_url,
            error_message: self.error_message,
        }
    }
}

/// Payload returned by `GET {engine}/status/{job_id}`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StatusPayload {
    pub status: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub resource: Option<ResourceMetrics>,
    pub log_key: Option<String>,
    pub logs_url: Option<String>,
    pub error_message: Option<String>,
}

impl StatusPayload {
    /// Remote status mapped onto the local enumeration
    ///
    /// Returns `None` when the engine reported no status or one that does not
    /// name a known state. `COMPLETED` maps to SUCCESS as it does for runs.
    pub fn mapped_status(&self) -> Option<JobStatus> {
        parse_engine_status(self.status.as_deref()?)
    }

    /// Output carried by the status answer, if any
    pub fn output(&self) -> Option<JobResult> {
        if self.stdout.is_none() && self.stderr.is_none() {
            return None;
        }

        Some(JobResult {
            stdout: self.stdout.clone().unwrap_or_default(),
            stderr: self.stderr.clone().unwrap_or_default(),
            resource: self.resource.filter(|r| !r.is_empty()),
            log_key: self.log_key.clone(),
            logs_url: self.logs_url.clone(),
            error_message: self.error_message.clone(),
        })
    }
}

/// Engine status word mapped onto a local state, `COMPLETED` included
fn parse_engine_status(raw: &str) -> Option<JobStatus> {
    if raw.trim().eq_ignore_ascii_case("COMPLETED") {
        return Some(JobStatus::Success);
    }
    raw.parse().ok()
}
