//! API Module
//!
//! HTTP API layer for the gateway.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod project;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Job lifecycle endpoints
        .route("/upload", post(job::upload_code))
        .route("/execute/{job_id}", post(job::execute_job))
        .route("/status/{job_id}", get(job::job_status))
        .route("/cancel/{job_id}", post(job::cancel_job))
        // Job query endpoints
        .route("/jobs", get(job::list_jobs))
        .route("/jobs/{job_id}", get(job::get_job))
        .route("/jobs/{job_id}/status", get(job::job_status))
        // Project endpoints
        .route("/projects", get(project::list_projects))
        .route("/projects/{project}/jobs", get(project::list_project_jobs))
        .route("/health", get(health::health_check));

    Router::new()
        .route("/", get(health::service_info))
        .route("/health", get(health::health_check))
        .nest("/api", api)
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
