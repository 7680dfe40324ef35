//! Health check handlers
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Plain-text banner at the root path
pub async fn root_banner() -> &'static str {
    concat!(
        "GeoConnect API ",
        env!("CARGO_PKG_VERSION"),
        "\n\nPOST /signup, POST /login, then with a bearer token:\n",
        "POST /post, GET /search, GET /search/area, DELETE /post/{id}, GET /me\n",
        "API documentation: /swagger-ui\n"
    )
}
