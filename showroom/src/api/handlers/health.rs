//! Liveness and readiness probes.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{AppState, api::models::responses::{ApiResponse, ErrorResponse}, errors::Result};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    /// Store backend in use, reported once connected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

/// The process is up. Never touches the store.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses((status = 200, description = "Process is alive", body = ApiResponse<HealthStatus>))
)]
pub async fn liveness() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::ok(HealthStatus {
        status: "ok".to_string(),
        backend: None,
    }))
}

/// The store is reachable. Connects on first call, like any other request would.
#[utoipa::path(
    get,
    path = "/readyz",
    tag = "health",
    responses(
        (status = 200, description = "Store reachable", body = ApiResponse<HealthStatus>),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn readiness(State(state): State<AppState>) -> Result<Json<ApiResponse<HealthStatus>>> {
    let store = state.db.connection().await?;
    store.ping().await?;

    Ok(Json(ApiResponse::ok(HealthStatus {
        status: "ready".to_string(),
        backend: Some(store.backend().to_string()),
    })))
}
