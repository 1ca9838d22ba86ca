//! Job domain types
//!
//! A job is one tracked request to execute a stored code artifact. Its status
//! moves through a small state machine whose legal edges are defined here, so
//! every component that mutates a job checks the same table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Job record
///
/// Structure shared between the job store (persists) and the orchestration
/// services (mutate status and attach results).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub job_id: Uuid,
    pub project: String,
    pub code_key: String,
    pub language: Language,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub timeout_ms: u64,
    pub result: Option<JobResult>,
}

impl Job {
    /// Creates a new job in `Pending` state with a fresh id
    pub fn new(
        project: impl Into<String>,
        code_key: impl Into<String>,
        language: Language,
        timeout_ms: u64,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            project: project.into(),
            code_key: code_key.into(),
            language,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            timeout_ms,
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Job lifecycle status
///
/// `Pending` is initial. `Success`, `Failed`, `Timeout` and `Cancelled` are
/// terminal: once reached, no further transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
    Timeout,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Success,
        JobStatus::Failed,
        JobStatus::Timeout,
        JobStatus::Cancelled,
    ];

    /// Returns true for states that admit no further transition
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Timeout | JobStatus::Cancelled
        )
    }

    /// Whether `self -> target` is an edge of the job state machine
    ///
    /// Legal edges:
    /// - `Pending -> Running`
    /// - `Pending -> Cancelled`
    /// - `Running -> Success | Failed | Timeout | Cancelled`
    pub fn can_transition_to(self, target: JobStatus) -> bool {
        match self {
            JobStatus::Pending => matches!(target, JobStatus::Running | JobStatus::Cancelled),
            JobStatus::Running => target.is_terminal(),
            _ => false,
        }
    }

    /// Whether a job in this state may carry a result payload
    pub fn carries_result(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Timeout => "TIMEOUT",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string that does not name any known state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    /// Parses a status name, ignoring ASCII case and surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Source language of a job's code artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Node,
    Java,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Node => "node",
            Language::Java => "java",
        }
    }

    /// File extension used when storing source code for this language
    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Node => "js",
            Language::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "node" => Ok(Language::Node),
            "java" => Ok(Language::Java),
            _ => Err(UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Output of a finished execution attached to a job
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    pub stdout: String,
    pub stderr: String,
    pub resource: Option<ResourceMetrics>,
    pub log_key: Option<String>,
    pub logs_url: Option<String>,
    pub error_message: Option<String>,
}

impl JobResult {
    /// Log reference, preferring the storage key over the URL
    pub fn log_reference(&self) -> Option<&str> {
        self.log_key.as_deref().or(self.logs_url.as_deref())
    }
}

/// Resource usage reported by the execution engine
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceMetrics {
    pub cpu_percent: Option<f64>,
    pub memory_mb: Option<f64>,
    pub execution_time_ms: Option<f64>,
}

impl ResourceMetrics {
    pub fn is_empty(&self) -> bool {
        self.cpu_percent.is_none() && self.memory_mb.is_none() && self.execution_time_ms.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_documented_edges_are_legal() {
        let legal = [
            (JobStatus::Pending, JobStatus::Running),
            (JobStatus::Pending, JobStatus::Cancelled),
            (JobStatus::Running, JobStatus::Success),
            (JobStatus::Running, JobStatus::Failed),
            (JobStatus::Running, JobStatus::Timeout),
            (JobStatus::Running, JobStatus::Cancelled),
        ];

        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_are_one_shot() {
        for from in JobStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(JobStatus::ALL.iter().all(|to| !from.can_transition_to(*to)));
        }
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn test_status_parsing_ignores_case() {
        assert_eq!("SUCCESS".parse::<JobStatus>(), Ok(JobStatus::Success));
        assert_eq!(" timeout ".parse::<JobStatus>(), Ok(JobStatus::Timeout));
        assert_eq!("Cancelled".parse::<JobStatus>(), Ok(JobStatus::Cancelled));
        assert!("COMPLETED".parse::<JobStatus>().is_err());
        assert!("".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&JobStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("python".parse::<Language>(), Ok(Language::Python));
        assert_eq!("Node".parse::<Language>(), Ok(Language::Node));
        assert_eq!("java".parse::<Language>(), Ok(Language::Java));
        assert_eq!(
            "ruby".parse::<Language>(),
            Err(UnsupportedLanguage("ruby".to_string()))
        );
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new("p1", "python/abc.py", Language::Python, 5000);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.result.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_log_reference_prefers_key() {
        let mut result = JobResult {
            logs_url: Some("https://logs/1".to_string()),
            ..Default::default()
        };
        assert_eq!(result.log_reference(), Some("https://logs/1"));
        result.log_key = Some("logs/1.log".to_string());
        assert_eq!(result.log_reference(), Some("logs/1.log"));
    }
}
