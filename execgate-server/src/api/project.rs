//! Project API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use execgate_core::domain::project::Project;
use execgate_core::dto::job::{JobResponse, ListJobsQuery};

use crate::api::error::ApiResult;
use crate::service::job as job_service;
use crate::state::AppState;

/// GET /api/projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    tracing::debug!("Listing projects");

    let projects = job_service::list_projects(state.store.as_ref()).await?;
    Ok(Json(projects))
}

/// GET /api/projects/{project}/jobs
/// Jobs of one project, newest first; unknown projects have none
pub async fn list_project_jobs(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobResponse>>> {
    tracing::debug!("Listing jobs for project: {}", project);

    let jobs = job_service::list_jobs(state.store.as_ref(), Some(&project), query.limit).await?;
    Ok(Json(
        jobs.into_iter()
            .map(|job| JobResponse::from_job(job, None))
            .collect(),
    ))
}
