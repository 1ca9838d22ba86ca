//! Job Service
//!
//! Business logic for code upload, job lookup and listing.

use execgate_core::domain::job::{Job, Language};
use execgate_core::domain::project::Project;
use execgate_core::dto::job::UploadCode;
use uuid::Uuid;

use super::JobError;
use crate::storage::CodeStore;
use crate::store::JobStore;

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1000;

/// Execution budget bounds applied at upload
#[derive(Debug, Clone, Copy)]
pub struct JobLimits {
    pub default_timeout_ms: u64,
    pub max_timeout_ms: u64,
}

/// Normalises a requested listing size to `1..=MAX_LIST_LIMIT`
pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_LIST_LIMIT,
        Some(n) if n < 1 => 1,
        Some(n) => usize::try_from(n).unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT),
    }
}

/// Store uploaded code and create a PENDING job for it
pub async fn upload_code(
    store: &dyn JobStore,
    code_store: &dyn CodeStore,
    req: UploadCode,
    limits: JobLimits,
) -> Result<Job, JobError> {
    let project = req.project.trim();
    if project.is_empty() {
        return Err(JobError::Validation("project cannot be empty".to_string()));
    }
    if req.code.trim().is_empty() {
        return Err(JobError::Validation("code cannot be empty".to_string()));
    }

    let language = req
        .language
        .parse::<Language>()
        .map_err(|e| JobError::UnsupportedLanguage(e.0))?;

    let timeout_ms = match req.timeout_ms {
        None => limits.default_timeout_ms,
        Some(0) => {
            return Err(JobError::Validation(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        Some(ms) if ms > limits.max_timeout_ms => {
            return Err(JobError::Validation(format!(
                "timeout_ms cannot exceed {}",
                limits.max_timeout_ms
            )));
        }
        Some(ms) => ms,
    };

    let code_key = code_store.put(language, &req.code).await?;

    store
        .ensure_project(project, req.description.as_deref())
        .await?;

    let job = Job::new(project, code_key, language, timeout_ms);
    store.insert_job(&job).await?;

    tracing::info!(
        "Job created: {} for project: {} ({}, entry point: {})",
        job.job_id,
        job.project,
        job.language,
        req.function_name.as_deref().unwrap_or("default")
    );

    Ok(job)
}

/// Get a job by ID
pub async fn get_job(store: &dyn JobStore, job_id: Uuid) -> Result<Job, JobError> {
    store
        .get_job(job_id)
        .await?
        .ok_or(JobError::NotFound(job_id))
}

/// List jobs newest first, optionally restricted to a project
pub async fn list_jobs(
    store: &dyn JobStore,
    project: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<Job>, JobError> {
    let jobs = store.list_jobs(project, clamp_limit(limit)).await?;
    Ok(jobs)
}

/// List all projects
pub async fn list_projects(store: &dyn JobStore) -> Result<Vec<Project>, JobError> {
    let projects = store.list_projects().await?;
    Ok(projects)
}
