//! Execution dispatcher
//!
//! Hands jobs to the execution engine without blocking the caller. A dispatch
//! claims a slot in a bounded queue, moves the job PENDING -> RUNNING and
//! returns. A background loop feeds queued requests to worker tasks, at most
//! `max_concurrent` at a time, and records each outcome through the state
//! machine.

use execgate_core::domain::execution::{ExecutionRecord, ExecutionRequest};
use execgate_core::domain::job::{Job, JobResult, JobStatus};
use execgate_engine::ExecutionEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{JobError, bounded, lifecycle};
use crate::store::{JobStore, StoreError};

#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Maximum number of engine runs in flight
    pub max_concurrent: usize,
    /// Maximum number of accepted requests waiting for a worker
    pub queue_depth: usize,
    /// Upper bound for one engine run call
    pub call_timeout: Duration,
}

/// Handle used to submit jobs for execution
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    queue: mpsc::Sender<ExecutionRequest>,
}

impl Dispatcher {
    /// Creates a dispatcher and spawns its worker loop
    ///
    /// The loop runs until every clone of the returned handle is dropped.
    pub fn start(
        store: Arc<dyn JobStore>,
        engine: Arc<dyn ExecutionEngine>,
        settings: DispatchSettings,
    ) -> (Self, JoinHandle<()>) {
        let (queue, requests) = mpsc::channel(settings.queue_depth.max(1));
        let worker = tokio::spawn(run_workers(
            Arc::clone(&store),
            engine,
            settings,
            requests,
        ));

        (Self { store, queue }, worker)
    }

    /// Submits a PENDING job for execution
    ///
    /// Returns the job as RUNNING once the request is queued. The engine's
    /// answer is applied later by a worker.
    pub async fn dispatch(&self, job_id: Uuid, input: Option<String>) -> Result<Job, JobError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(JobError::NotFound(job_id))?;

        if !job.status.can_transition_to(JobStatus::Running) {
            return Err(JobError::AlreadyStarted {
                job_id,
                status: job.status,
            });
        }

        // Claim queue capacity before touching the job so a full queue
        // leaves it PENDING
        let slot = self.queue.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(()) => {
                warn!("Dispatch queue full, job {} stays pending", job_id);
                JobError::QueueFull(job_id)
            }
            mpsc::error::TrySendError::Closed(()) => JobError::DispatcherStopped,
        })?;

        if !lifecycle::apply(self.store.as_ref(), &job, JobStatus::Running, None).await? {
            // Dropping the slot releases the queue capacity
            let status = self
                .store
                .get_job(job_id)
                .await?
                .map(|j| j.status)
                .unwrap_or(job.status);
            return Err(JobError::AlreadyStarted { job_id, status });
        }

        let running = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(JobError::NotFound(job_id))?;

        slot.send(ExecutionRequest {
            job_id,
            code_key: job.code_key,
            language: job.language,
            input: input.unwrap_or_default(),
            timeout_ms: job.timeout_ms,
        });

        info!("Job {} queued for execution", job_id);
        Ok(running)
    }
}

/// Pulls queued requests and runs each in its own task
async fn run_workers(
    store: Arc<dyn JobStore>,
    engine: Arc<dyn ExecutionEngine>,
    settings: DispatchSettings,
    mut requests: mpsc::Receiver<ExecutionRequest>,
) {
    let semaphore = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));

    info!(
        "Dispatcher started (max concurrent: {}, queue depth: {})",
        settings.max_concurrent, settings.queue_depth
    );

    loop {
        // Wait for a free worker before taking the next request off the queue
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let Some(request) = requests.recv().await else {
            break;
        };

        let store = Arc::clone(&store);
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            run_attempt(store, engine, request, settings.call_timeout).await;
            drop(permit);
        });
    }

    info!("Dispatcher stopped");
}

/// Runs one attempt, forcing the job to FAILED if the attempt itself breaks
async fn run_attempt(
    store: Arc<dyn JobStore>,
    engine: Arc<dyn ExecutionEngine>,
    request: ExecutionRequest,
    call_timeout: Duration,
) {
    let job_id = request.job_id;
    let attempt = tokio::spawn(execute(Arc::clone(&store), engine, request, call_timeout));

    let failure = match attempt.await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{}", e),
        Err(e) => format!("attempt aborted: {}", e),
    };

    error!("Execution of job {} failed locally: {}", job_id, failure);
    match lifecycle::transition(store.as_ref(), job_id, JobStatus::Failed).await {
        Ok(true) => {}
        Ok(false) => debug!("Job {} already left RUNNING", job_id),
        Err(e) => error!("Could not mark job {} as failed: {}", job_id, e),
    }
}

async fn execute(
    store: Arc<dyn JobStore>,
    engine: Arc<dyn ExecutionEngine>,
    request: ExecutionRequest,
    call_timeout: Duration,
) -> Result<(), StoreError> {
    let job_id = request.job_id;

    // The job may have been cancelled while its request sat in the queue
    match store.get_job(job_id).await? {
        Some(job) if job.status == JobStatus::Running => {}
        Some(job) => {
            info!(
                "Skipping queued run of job {}: job is {}",
                job_id, job.status
            );
            return Ok(());
        }
        None => {
            warn!("Skipping queued run of job {}: job no longer exists", job_id);
            return Ok(());
        }
    }

    debug!("Running job {} on the execution engine", job_id);

    let (target, result): (JobStatus, Option<JobResult>) =
        match bounded(call_timeout, engine.run(&request)).await {
            Ok(payload) => {
                let target = payload.outcome().unwrap_or_else(|e| {
                    warn!("Job {}: {}", job_id, e);
                    JobStatus::Failed
                });
                let result = payload.into_result();
                store
                    .record_execution(&ExecutionRecord::from_result(job_id, &result))
                    .await?;
                (target, Some(result))
            }
            Err(e) => {
                warn!("Engine run for job {} failed: {}", job_id, e);
                (JobStatus::Failed, None)
            }
        };

    if lifecycle::transition_with_result(store.as_ref(), job_id, target, result).await? {
        info!("Job {} finished with status {}", job_id, target);
    } else {
        warn!(
            "Discarding late {} result for job {}: job is no longer running",
            target, job_id
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::EngineSettings;
    use crate::service::cancel::cancel;
    use crate::service::testing::{RunBehavior, StubEngine};
    use crate::store::MemoryJobStore;
    use execgate_core::domain::job::Language;

    const OK_BODY: &str = r#"{"stdout": "1\n", "stderr": "", "execution_time_ms": 12}"#;

    fn settings() -> DispatchSettings {
        DispatchSettings {
            max_concurrent: 4,
            queue_depth: 8,
            call_timeout: Duration::from_secs(5),
        }
    }

    fn engine_settings() -> EngineSettings {
        EngineSettings {
            call_timeout: Duration::from_secs(1),
            status_polling: true,
        }
    }

    async fn setup(
        engine: StubEngine,
        settings: DispatchSettings,
    ) -> (Arc<MemoryJobStore>, Arc<StubEngine>, Dispatcher) {
        let store = Arc::new(MemoryJobStore::new());
        let engine = Arc::new(engine);
        let (dispatcher, _worker) = Dispatcher::start(store.clone(), engine.clone(), settings);
        (store, engine, dispatcher)
    }

    async fn pending_job(store: &MemoryJobStore) -> Uuid {
        let job = Job::new("p1", "python/a.py", Language::Python, 1000);
        store.insert_job(&job).await.unwrap();
        job.job_id
    }

    async fn wait_for_terminal(store: &MemoryJobStore, job_id: Uuid) -> Job {
        for _ in 0..200 {
            let job = store.get_job(job_id).await.unwrap().unwrap();
            if job.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    #[tokio::test]
    async fn test_successful_run_attaches_result() {
        let (store, _engine, dispatcher) = setup(StubEngine::responding(OK_BODY), settings()).await;
        let job_id = pending_job(&store).await;

        let running = dispatcher.dispatch(job_id, None).await.unwrap();
        assert_eq!(running.status, JobStatus::Running);

        let job = wait_for_terminal(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Success);
        let result = job.result.unwrap();
        assert_eq!(result.stdout, "1\n");
        assert_eq!(result.resource.unwrap().execution_time_ms, Some(12.0));

        let execution = store.latest_execution(job_id).await.unwrap().unwrap();
        assert_eq!(execution.stdout, "1\n");
    }

    #[tokio::test]
    async fn test_engine_reported_failure_keeps_partial_output() {
        let body = r#"{"stdout": "partial", "stderr": "boom", "status": "FAILED"}"#;
        let (store, _engine, dispatcher) = setup(StubEngine::responding(body), settings()).await;
        let job_id = pending_job(&store).await;

        dispatcher.dispatch(job_id, None).await.unwrap();
        let job = wait_for_terminal(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.result.unwrap().stderr, "boom");
    }

    #[tokio::test]
    async fn test_engine_reported_timeout() {
        let body = r#"{"stdout": "", "stderr": "", "status": "TIMEOUT"}"#;
        let (store, _engine, dispatcher) = setup(StubEngine::responding(body), settings()).await;
        let job_id = pending_job(&store).await;

        dispatcher.dispatch(job_id, None).await.unwrap();
        let job = wait_for_terminal(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Timeout);
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_submit_timeout_fails_without_result() {
        let mut settings = settings();
        settings.call_timeout = Duration::from_millis(50);
        let (store, _engine, dispatcher) =
            setup(StubEngine::new(RunBehavior::Hang), settings).await;
        let job_id = pending_job(&store).await;

        dispatcher.dispatch(job_id, None).await.unwrap();
        let job = wait_for_terminal(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_none());
        assert!(store.latest_execution(job_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_engine_error_and_malformed_payload_fail() {
        for engine in [
            StubEngine::new(RunBehavior::Fail),
            StubEngine::responding(r#"{"stdout": "1", "stderr": "", "extra": true}"#),
            StubEngine::responding("[1, 2]"),
        ] {
            let (store, _engine, dispatcher) = setup(engine, settings()).await;
            let job_id = pending_job(&store).await;

            dispatcher.dispatch(job_id, None).await.unwrap();
            let job = wait_for_terminal(&store, job_id).await;
            assert_eq!(job.status, JobStatus::Failed);
            assert!(job.result.is_none());
        }
    }

    #[tokio::test]
    async fn test_panicking_attempt_is_failed() {
        let (store, _engine, dispatcher) =
            setup(StubEngine::new(RunBehavior::Panic), settings()).await;
        let job_id = pending_job(&store).await;

        dispatcher.dispatch(job_id, None).await.unwrap();
        let job = wait_for_terminal(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_runs_once() {
        let engine = StubEngine::responding(OK_BODY).with_delay(Duration::from_millis(50));
        let (store, engine, dispatcher) = setup(engine, settings()).await;
        let job_id = pending_job(&store).await;

        let (first, second) = tokio::join!(
            dispatcher.dispatch(job_id, None),
            dispatcher.dispatch(job_id, None)
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(JobError::AlreadyStarted { .. })))
        );

        let job = wait_for_terminal(&store, job_id).await;
        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(engine.run_count(), 1);
    }

    #[tokio::test]
    async fn test_redispatch_of_finished_job_rejected() {
        let (store, _engine, dispatcher) = setup(StubEngine::responding(OK_BODY), settings()).await;
        let job_id = pending_job(&store).await;

        dispatcher.dispatch(job_id, None).await.unwrap();
        wait_for_terminal(&store, job_id).await;

        match dispatcher.dispatch(job_id, None).await {
            Err(JobError::AlreadyStarted { status, .. }) => assert_eq!(status, JobStatus::Success),
            other => panic!("expected AlreadyStarted, got {:?}", other.map(|j| j.status)),
        }
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let (_store, _engine, dispatcher) = setup(StubEngine::responding(OK_BODY), settings()).await;
        assert!(matches!(
            dispatcher.dispatch(Uuid::new_v4(), None).await,
            Err(JobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_full_queue_leaves_job_pending() {
        let settings = DispatchSettings {
            max_concurrent: 1,
            queue_depth: 1,
            call_timeout: Duration::from_secs(60),
        };
        let (store, engine, dispatcher) =
            setup(StubEngine::new(RunBehavior::Hang), settings).await;

        // First job occupies the only worker
        let busy = pending_job(&store).await;
        dispatcher.dispatch(busy, None).await.unwrap();
        for _ in 0..200 {
            if engine.run_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(engine.run_count(), 1);

        // Second job fills the queue
        let queued = pending_job(&store).await;
        dispatcher.dispatch(queued, None).await.unwrap();

        let rejected = pending_job(&store).await;
        assert!(matches!(
            dispatcher.dispatch(rejected, None).await,
            Err(JobError::QueueFull(_))
        ));
        let job = store.get_job(rejected).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_late_result_after_cancel_is_discarded() {
        let engine = StubEngine::responding(OK_BODY).with_delay(Duration::from_millis(100));
        let (store, engine, dispatcher) = setup(engine, settings()).await;
        let job_id = pending_job(&store).await;

        dispatcher.dispatch(job_id, None).await.unwrap();
        for _ in 0..200 {
            if engine.run_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(engine.run_count(), 1);
        assert!(
            lifecycle::transition(store.as_ref(), job_id, JobStatus::Cancelled)
                .await
                .unwrap()
        );

        // Give the engine time to answer
        for _ in 0..100 {
            if store.latest_execution(job_id).await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(engine.run_count(), 1);
        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_job_cancelled_while_queued_never_reaches_engine() {
        let settings = DispatchSettings {
            max_concurrent: 1,
            queue_depth: 4,
            call_timeout: Duration::from_secs(5),
        };
        let engine = StubEngine::responding(OK_BODY).with_delay(Duration::from_millis(200));
        let (store, engine, dispatcher) = setup(engine, settings).await;

        let busy = pending_job(&store).await;
        let queued = pending_job(&store).await;
        dispatcher.dispatch(busy, None).await.unwrap();
        dispatcher.dispatch(queued, None).await.unwrap();

        // The queued job waits behind the busy one
        for _ in 0..200 {
            if engine.run_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(engine.run_count(), 1);

        let outcome = cancel(store.as_ref(), engine.as_ref(), queued, engine_settings())
            .await
            .unwrap();
        assert!(outcome.transitioned);

        let finished = wait_for_terminal(&store, busy).await;
        assert_eq!(finished.status, JobStatus::Success);
        // Let the worker pick up and drop the cancelled request
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(engine.run_count(), 1);
        let job = store.get_job(queued).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.result.is_none());
        assert!(store.latest_execution(queued).await.unwrap().is_none());
    }
}
