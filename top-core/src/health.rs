//! Liveness endpoint.
//!
//! `GET /health` answers `{"status": "OK"}` as long as the process serves
//! requests. There are no downstream dependencies to probe.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Body of the health response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}

/// Router exposing `GET /health`.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}
