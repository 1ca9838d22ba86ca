//! Job state machine enforcement
//!
//! Every status change goes through here. An edge is applied only if it is
//! legal and the job still has the status it was read with; otherwise the
//! request is reported as not applied.

use execgate_core::domain::job::{Job, JobResult, JobStatus};
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{JobStore, StatusUpdate, StoreResult};

/// Moves a job to `target`, returning whether the change was applied
pub async fn transition(store: &dyn JobStore, job_id: Uuid, target: JobStatus) -> StoreResult<bool> {
    transition_with_result(store, job_id, target, None).await
}

/// Like [`transition`], writing `result` in the same conditional update
///
/// The result is only kept for targets that carry one (SUCCESS, FAILED).
pub async fn transition_with_result(
    store: &dyn JobStore,
    job_id: Uuid,
    target: JobStatus,
    result: Option<JobResult>,
) -> StoreResult<bool> {
    let Some(job) = store.get_job(job_id).await? else {
        debug!("Transition of unknown job {} to {} ignored", job_id, target);
        return Ok(false);
    };

    apply(store, &job, target, result).await
}

/// Applies `job.status -> target` conditioned on the status read into `job`
pub async fn apply(
    store: &dyn JobStore,
    job: &Job,
    target: JobStatus,
    result: Option<JobResult>,
) -> StoreResult<bool> {
    let from = job.status;
    if !from.can_transition_to(target) {
        debug!("Rejected transition {} -> {} for job {}", from, target, job.job_id);
        return Ok(false);
    }

    let result = result.filter(|_| target.carries_result());
    let applied = store
        .compare_and_set_status(job.job_id, from, StatusUpdate::new(target).with_result(result))
        .await?;

    if applied {
        info!("Job {} transitioned {} -> {}", job.job_id, from, target);
    } else {
        debug!(
            "Job {} changed concurrently, transition {} -> {} not applied",
            job.job_id, from, target
        );
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryJobStore;
    use execgate_core::domain::job::Language;

    async fn pending_job(store: &MemoryJobStore) -> Job {
        let job = Job::new("p1", "python/a.py", Language::Python, 1000);
        store.insert_job(&job).await.unwrap();
        job
    }

    #[tokio::test]
    async fn test_legal_path_to_success() {
        let store = MemoryJobStore::new();
        let job = pending_job(&store).await;

        assert!(transition(&store, job.job_id, JobStatus::Running).await.unwrap());
        let result = JobResult {
            stdout: "ok".to_string(),
            ..Default::default()
        };
        assert!(
            transition_with_result(&store, job.job_id, JobStatus::Success, Some(result))
                .await
                .unwrap()
        );

        let stored = store.get_job(job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Success);
        assert_eq!(stored.result.unwrap().stdout, "ok");
        assert!(stored.started_at.is_some());
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_illegal_edge_leaves_job_untouched() {
        let store = MemoryJobStore::new();
        let job = pending_job(&store).await;

        assert!(!transition(&store, job.job_id, JobStatus::Success).await.unwrap());
        let stored = store.get_job(job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.updated_at, job.updated_at);
    }

    #[tokio::test]
    async fn test_terminal_state_is_final() {
        let store = MemoryJobStore::new();
        let job = pending_job(&store).await;

        assert!(transition(&store, job.job_id, JobStatus::Cancelled).await.unwrap());
        for target in JobStatus::ALL {
            assert!(!transition(&store, job.job_id, target).await.unwrap());
        }
        let stored = store.get_job(job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_applied() {
        let store = MemoryJobStore::new();
        assert!(!transition(&store, Uuid::new_v4(), JobStatus::Running).await.unwrap());
    }

    #[tokio::test]
    async fn test_result_dropped_for_timeout() {
        let store = MemoryJobStore::new();
        let job = pending_job(&store).await;
        transition(&store, job.job_id, JobStatus::Running).await.unwrap();

        let applied = transition_with_result(
            &store,
            job.job_id,
            JobStatus::Timeout,
            Some(JobResult::default()),
        )
        .await
        .unwrap();
        assert!(applied);
        assert!(store.get_job(job.job_id).await.unwrap().unwrap().result.is_none());
    }

    #[tokio::test]
    async fn test_stale_read_loses() {
        let store = MemoryJobStore::new();
        let job = pending_job(&store).await;

        // Someone else moves the job after our read
        assert!(transition(&store, job.job_id, JobStatus::Running).await.unwrap());
        assert!(!apply(&store, &job, JobStatus::Cancelled, None).await.unwrap());
        let stored = store.get_job(job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Running);
    }
}
