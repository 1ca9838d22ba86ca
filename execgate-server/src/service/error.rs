use execgate_core::domain::job::JobStatus;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::CodeStoreError;
use crate::store::StoreError;

/// Service error type
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("{0}")]
    Validation(String),

    /// The job left PENDING before this dispatch could claim it
    #[error("Job {job_id} cannot be dispatched: status is {status}")]
    AlreadyStarted { job_id: Uuid, status: JobStatus },

    #[error("Dispatch queue is full, job {0} left pending")]
    QueueFull(Uuid),

    #[error("Dispatcher is not accepting work")]
    DispatcherStopped,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    CodeStorage(#[from] CodeStoreError),
}
