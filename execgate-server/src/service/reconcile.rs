//! Status reconciliation
//!
//! Answers status queries from the local record, pulling the engine's view in
//! first when the job is still live. Remote information only ever moves a job
//! along a legal edge; anything the engine says that cannot be applied is
//! ignored.

use execgate_core::domain::execution::ExecutionRecord;
use execgate_core::domain::job::Job;
use execgate_engine::ExecutionEngine;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{EngineSettings, JobError, bounded, lifecycle};
use crate::store::JobStore;

/// Reconciled view of a job
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub job: Job,
    /// Most recent execution attempt, if any
    pub execution: Option<ExecutionRecord>,
    /// Whether the engine's status was applied during this query
    pub applied: bool,
}

pub async fn reconcile(
    store: &dyn JobStore,
    engine: &dyn ExecutionEngine,
    job_id: Uuid,
    settings: EngineSettings,
) -> Result<StatusReport, JobError> {
    let job = store
        .get_job(job_id)
        .await?
        .ok_or(JobError::NotFound(job_id))?;

    if job.is_terminal() || !settings.status_polling {
        return report(store, job, false).await;
    }

    let remote = match bounded(settings.call_timeout, engine.status(job_id)).await {
        Ok(Some(remote)) => remote,
        Ok(None) => {
            debug!("Engine has no status for job {}", job_id);
            return report(store, job, false).await;
        }
        Err(e) => {
            warn!("Status query for job {} failed: {}", job_id, e);
            return report(store, job, false).await;
        }
    };

    let Some(remote_status) = remote.mapped_status() else {
        debug!(
            "Ignoring unrecognized engine status {:?} for job {}",
            remote.status, job_id
        );
        return report(store, job, false).await;
    };

    let mut applied = false;
    if remote_status != job.status {
        let output = if remote_status.carries_result() {
            remote.output()
        } else {
            None
        };
        applied = lifecycle::apply(store, &job, remote_status, output).await?;
        if !applied {
            debug!(
                "Engine status {} not applicable to job {} in {}",
                remote_status, job_id, job.status
            );
        }
    }

    let job = store
        .get_job(job_id)
        .await?
        .ok_or(JobError::NotFound(job_id))?;
    report(store, job, applied).await
}

async fn report(store: &dyn JobStore, job: Job, applied: bool) -> Result<StatusReport, JobError> {
    let execution = store.latest_execution(job.job_id).await?;
    Ok(StatusReport {
        job,
        execution,
        applied,
    })
}
