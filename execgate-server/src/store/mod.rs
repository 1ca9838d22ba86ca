//! Store Module
//!
//! Data access layer for the gateway.
//! Jobs, projects and execution attempts live behind the [`JobStore`] trait so
//! services can run against Postgres in production and an in-memory store in
//! tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

use async_trait::async_trait;
use execgate_core::domain::execution::ExecutionRecord;
use execgate_core::domain::job::{Job, JobResult, JobStatus};
use execgate_core::domain::project::Project;
use thiserror::Error;
use uuid::Uuid;

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped back onto the domain model
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Write applied by a successful compare-and-set
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: JobStatus,
    pub at: chrono::DateTime<chrono::Utc>,
    pub result: Option<JobResult>,
}

impl StatusUpdate {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            at: chrono::Utc::now(),
            result: None,
        }
    }

    pub fn with_result(mut self, result: Option<JobResult>) -> Self {
        self.result = result;
        self
    }

    /// Applies the update to an in-memory job
    ///
    /// `started_at` is stamped on entering RUNNING and `completed_at` on
    /// entering a terminal state; neither is overwritten once set.
    pub fn apply_to(self, job: &mut Job) {
        job.status = self.status;
        job.updated_at = self.at;

        if self.status == JobStatus::Running && job.started_at.is_none() {
            job.started_at = Some(self.at);
        }
        if self.status.is_terminal() && job.completed_at.is_none() {
            job.completed_at = Some(self.at);
        }
        if let Some(result) = self.result {
            job.result = Some(result);
        }
    }
}

/// Persistence operations needed by the gateway
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: &Job) -> StoreResult<()>;

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<Job>>;

    /// Writes `update` only if the job's status still equals `expected`
    ///
    /// Returns whether the write happened. A missing job is reported as
    /// `false`.
    async fn compare_and_set_status(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> StoreResult<bool>;

    /// Lists jobs newest first, optionally restricted to one project
    async fn list_jobs(&self, project: Option<&str>, limit: usize) -> StoreResult<Vec<Job>>;

    /// Returns the named project, creating it on first use
    async fn ensure_project(&self, project: &str, description: Option<&str>)
    -> StoreResult<Project>;

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;

    async fn record_execution(&self, record: &ExecutionRecord) -> StoreResult<()>;

    /// Most recent execution attempt of a job
    async fn latest_execution(&self, job_id: Uuid) -> StoreResult<Option<ExecutionRecord>>;
}
