//! In-memory job store
//!
//! Keeps jobs, projects and execution attempts in process memory. Every
//! operation runs under one lock, which gives compare-and-set the same
//! atomicity the Postgres store gets from its conditional UPDATE.

use async_trait::async_trait;
use execgate_core::domain::execution::ExecutionRecord;
use execgate_core::domain::job::{Job, JobStatus};
use execgate_core::domain::project::Project;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{JobStore, StatusUpdate, StoreResult};

#[derive(Debug, Default)]
struct State {
    jobs: HashMap<Uuid, Job>,
    /// Job ids in insertion order
    order: Vec<Uuid>,
    projects: BTreeMap<String, Project>,
    executions: Vec<ExecutionRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: Mutex<State>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.jobs.insert(job.job_id, job.clone()).is_none() {
            state.order.push(job.job_id);
        }
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<Job>> {
        let state = self.state.lock().await;
        Ok(state.jobs.get(&job_id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&job_id) {
            Some(job) if job.status == expected => {
                update.apply_to(job);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_jobs(&self, project: Option<&str>, limit: usize) -> StoreResult<Vec<Job>> {
        let state = self.state.lock().await;
        let jobs = state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.jobs.get(id))
            .filter(|job| project.is_none_or(|p| job.project == p))
            .take(limit)
            .cloned()
            .collect();
        Ok(jobs)
    }

    async fn ensure_project(
        &self,
        project: &str,
        description: Option<&str>,
    ) -> StoreResult<Project> {
        let mut state = self.state.lock().await;
        let entry = state
            .projects
            .entry(project.to_string())
            .or_insert_with(|| Project {
                project: project.to_string(),
                description: description.map(str::to_string),
                created_at: chrono::Utc::now(),
            });
        Ok(entry.clone())
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let state = self.state.lock().await;
        Ok(state.projects.values().cloned().collect())
    }

    async fn record_execution(&self, record: &ExecutionRecord) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.executions.push(record.clone());
        Ok(())
    }

    async fn latest_execution(&self, job_id: Uuid) -> StoreResult<Option<ExecutionRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .executions
            .iter()
            .rev()
            .find(|record| record.job_id == job_id)
            .cloned())
    }
}
