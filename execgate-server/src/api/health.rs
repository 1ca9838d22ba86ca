//! Health Check API Handlers
//!
//! Liveness and service metadata endpoints for monitoring.

use axum::{Json, http::StatusCode, response::IntoResponse};

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// GET /
/// Service name and version
pub async fn service_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}
