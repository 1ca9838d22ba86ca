//! Job cancellation
//!
//! The local CANCELLED state is written first and is final; telling the
//! engine to stop is a best-effort notification afterwards.

use execgate_core::domain::job::{Job, JobStatus};
use execgate_engine::ExecutionEngine;
use tracing::{info, warn};
use uuid::Uuid;

use super::{EngineSettings, JobError, bounded, lifecycle};
use crate::store::JobStore;

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub job: Job,
    /// False when the job was already terminal
    pub transitioned: bool,
    pub engine_acknowledged: bool,
}

pub async fn cancel(
    store: &dyn JobStore,
    engine: &dyn ExecutionEngine,
    job_id: Uuid,
    settings: EngineSettings,
) -> Result<CancelOutcome, JobError> {
    let mut job = store
        .get_job(job_id)
        .await?
        .ok_or(JobError::NotFound(job_id))?;
    let mut was_running = false;

    // Retry while a concurrent transition keeps moving the job
    loop {
        if job.is_terminal() {
            info!("Job {} already {}, nothing to cancel", job_id, job.status);
            return Ok(CancelOutcome {
                job,
                transitioned: false,
                engine_acknowledged: false,
            });
        }

        was_running |= job.status == JobStatus::Running;
        if lifecycle::apply(store, &job, JobStatus::Cancelled, None).await? {
            break;
        }

        job = store
            .get_job(job_id)
            .await?
            .ok_or(JobError::NotFound(job_id))?;
    }

    let engine_acknowledged = if was_running {
        match bounded(settings.call_timeout, engine.cancel(job_id)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Engine did not acknowledge cancellation of job {}: {}", job_id, e);
                false
            }
        }
    } else {
        false
    };

    let job = store
        .get_job(job_id)
        .await?
        .ok_or(JobError::NotFound(job_id))?;

    Ok(CancelOutcome {
        job,
        transitioned: true,
        engine_acknowledged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::dispatch::{DispatchSettings, Dispatcher};
    use crate::service::testing::{RunBehavior, StubEngine};
    use crate::store::MemoryJobStore;
    use execgate_core::domain::job::Language;
    use std::sync::Arc;
    use std::time::Duration;

    fn settings() -> EngineSettings {
        EngineSettings {
            call_timeout: Duration::from_secs(1),
            status_polling: true,
        }
    }

    async fn job_in(store: &MemoryJobStore, status: JobStatus) -> Uuid {
        let mut job = Job::new("p1", "python/a.py", Language::Python, 1000);
        job.status = status;
        store.insert_job(&job).await.unwrap();
        job.job_id
    }

    #[tokio::test]
    async fn test_cancel_pending_then_dispatch_rejected() {
        let store = Arc::new(MemoryJobStore::new());
        let engine = Arc::new(StubEngine::responding(r#"{"stdout": "", "stderr": ""}"#));
        let job_id = job_in(&store, JobStatus::Pending).await;

        let outcome = cancel(store.as_ref(), engine.as_ref(), job_id, settings())
            .await
            .unwrap();
        assert!(outcome.transitioned);
        assert_eq!(outcome.job.status, JobStatus::Cancelled);
        assert!(outcome.job.completed_at.is_some());
        // Engine never heard of a pending job
        assert!(!outcome.engine_acknowledged);
        assert_eq!(engine.cancel_count(), 0);

        let (dispatcher, _worker) = Dispatcher::start(
            store.clone(),
            engine.clone(),
            DispatchSettings {
                max_concurrent: 1,
                queue_depth: 1,
                call_timeout: Duration::from_secs(1),
            },
        );
        assert!(matches!(
            dispatcher.dispatch(job_id, None).await,
            Err(JobError::AlreadyStarted {
                status: JobStatus::Cancelled,
                ..
            })
        ));
        assert_eq!(engine.run_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_running_notifies_engine() {
        let store = MemoryJobStore::new();
        let engine = StubEngine::new(RunBehavior::Hang);
        let job_id = job_in(&store, JobStatus::Running).await;

        let outcome = cancel(&store, &engine, job_id, settings()).await.unwrap();
        assert!(outcome.transitioned);
        assert!(outcome.engine_acknowledged);
        assert_eq!(engine.cancel_count(), 1);
        assert_eq!(outcome.job.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_engine_refusal_does_not_block_local_cancel() {
        let store = MemoryJobStore::new();
        let mut engine = StubEngine::new(RunBehavior::Hang);
        engine.cancel_ok = false;
        let job_id = job_in(&store, JobStatus::Running).await;

        let outcome = cancel(&store, &engine, job_id, settings()).await.unwrap();
        assert!(outcome.transitioned);
        assert!(!outcome.engine_acknowledged);
        assert_eq!(outcome.job.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_terminal_is_noop() {
        let store = MemoryJobStore::new();
        let engine = StubEngine::new(RunBehavior::Hang);

        for status in [JobStatus::Success, JobStatus::Failed, JobStatus::Timeout, JobStatus::Cancelled] {
            let job_id = job_in(&store, status).await;
            let outcome = cancel(&store, &engine, job_id, settings()).await.unwrap();
            assert!(!outcome.transitioned);
            assert_eq!(outcome.job.status, status);
        }
        assert_eq!(engine.cancel_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = MemoryJobStore::new();
        let engine = StubEngine::new(RunBehavior::Hang);
        assert!(matches!(
            cancel(&store, &engine, Uuid::new_v4(), settings()).await,
            Err(JobError::NotFound(_))
        ));
    }
}
