//! Job API Handlers
//!
//! HTTP endpoints for code upload and the job lifecycle.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use execgate_core::dto::job::{CancelResponse, ExecuteQuery, JobResponse, ListJobsQuery, UploadCode};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::service::{cancel, job as job_service, reconcile};
use crate::state::AppState;

// =============================================================================
// Job Lifecycle Endpoints
// =============================================================================

/// POST /api/upload
/// Store code and create a pending job
pub async fn upload_code(
    State(state): State<AppState>,
    Json(req): Json<UploadCode>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    tracing::info!("Uploading {} code for project: {}", req.language, req.project);

    let job = job_service::upload_code(
        state.store.as_ref(),
        state.code_store.as_ref(),
        req,
        state.limits,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(JobResponse::from_job(job, Some("Code uploaded".to_string()))),
    ))
}

/// POST /api/execute/{job_id}
/// Hand a pending job to the execution engine
pub async fn execute_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ExecuteQuery>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    tracing::info!("Dispatching job: {}", job_id);

    let job = state.dispatcher.dispatch(job_id, query.input).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobResponse::from_job(job, Some("Job dispatched".to_string()))),
    ))
}

/// GET /api/status/{job_id}, GET /api/jobs/{job_id}/status
/// Job status, refreshed from the engine while the job is live
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    tracing::debug!("Reconciling status of job: {}", job_id);

    let report = reconcile::reconcile(
        state.store.as_ref(),
        state.engine.as_ref(),
        job_id,
        state.engine_settings,
    )
    .await?;

    let message = report
        .applied
        .then(|| format!("Job status: {} (updated from engine)", report.job.status));

    Ok(Json(
        JobResponse::from_job(report.job, message).with_execution(report.execution.as_ref()),
    ))
}

/// GET /api/jobs/{job_id}
/// Stored job record
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    tracing::debug!("Getting job: {}", job_id);

    let job = job_service::get_job(state.store.as_ref(), job_id).await?;
    Ok(Json(JobResponse::from_job(job, None)))
}

/// POST /api/cancel/{job_id}
/// Cancel a job that has not finished
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    tracing::info!("Cancelling job: {}", job_id);

    let outcome = cancel::cancel(
        state.store.as_ref(),
        state.engine.as_ref(),
        job_id,
        state.engine_settings,
    )
    .await?;

    if !outcome.transitioned {
        return Err(ApiError::Conflict(format!(
            "Job {} is already {}",
            job_id, outcome.job.status
        )));
    }

    Ok(Json(CancelResponse {
        job: JobResponse::from_job(outcome.job, Some("Job cancelled".to_string())),
        engine_acknowledged: outcome.engine_acknowledged,
    }))
}

// =============================================================================
// Job Query Endpoints
// =============================================================================

/// GET /api/jobs
/// List all jobs, newest first
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobResponse>>> {
    tracing::debug!("Listing jobs");

    let jobs = job_service::list_jobs(state.store.as_ref(), None, query.limit).await?;
    Ok(Json(
        jobs.into_iter()
            .map(|job| JobResponse::from_job(job, None))
            .collect(),
    ))
}
