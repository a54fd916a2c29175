//! Health endpoint.

use crate::server::{ApiError, AppState};
use axum::{Json, extract::State};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// The store's answer to `PING`, normally `"PONG"`.
    pub redis: String,
}

/// Liveness check that round-trips to the store.
///
/// # Errors
///
/// 503 when the store does not answer.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let redis = state.store.ping().await?;
    Ok(Json(HealthResponse { redis }))
}
