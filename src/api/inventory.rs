//! Inventory endpoints: seeding, counts, manual reclaim.

use crate::server::{ApiError, AppState};
use crate::store::TicketStore;
use crate::types::{ClassCounts, ClassId, TicketId};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

/// Response body for `POST /preload/{class}`.
#[derive(Debug, Serialize)]
pub struct PreloadResponse {
    /// Number of tickets seeded.
    pub loaded: usize,
}

/// Seeds tickets into a class.
///
/// Each ticket must carry a `ticket_id` field; everything else is opaque
/// payload returned to buyers on purchase. Trusted admin/dev operation:
/// seeding does not check an id's current lifecycle position.
///
/// # Errors
///
/// 400 when a ticket has no `ticket_id`, 503 when the store is down.
pub async fn preload(
    Path(class): Path<u32>,
    State(state): State<AppState>,
    Json(tickets): Json<Vec<serde_json::Value>>,
) -> Result<Json<PreloadResponse>, ApiError> {
    let loaded = state.store.preload(ClassId::new(class), &tickets).await?;
    Ok(Json(PreloadResponse { loaded }))
}

/// Reports the lifecycle set cardinalities of a class.
///
/// # Errors
///
/// 503 when the store is down.
pub async fn counts(
    Path(class): Path<u32>,
    State(state): State<AppState>,
) -> Result<Json<ClassCounts>, ApiError> {
    let counts = state.store.counts(ClassId::new(class)).await?;
    Ok(Json(counts))
}

/// Query parameters for `POST /reclaim/{class}`.
#[derive(Debug, Deserialize)]
pub struct ReclaimParams {
    /// Maximum leases reclaimed in this invocation (defaults to 1000).
    pub limit: Option<usize>,
}

/// Response body for `POST /reclaim/{class}`.
#[derive(Debug, Serialize)]
pub struct ReclaimResponse {
    /// Ids returned to `available`.
    pub reclaimed: Vec<TicketId>,
}

/// Manually reclaims expired leases for a class.
///
/// Useful for classes without a background sweeper, and in tests.
///
/// # Errors
///
/// 400 when `limit` is zero, 503 when the store is down.
pub async fn reclaim(
    Path(class): Path<u32>,
    Query(params): Query<ReclaimParams>,
    State(state): State<AppState>,
) -> Result<Json<ReclaimResponse>, ApiError> {
    let limit = params.limit.unwrap_or(1000);
    let reclaimed = state
        .store
        .reclaim_expired(ClassId::new(class), limit)
        .await?;
    Ok(Json(ReclaimResponse { reclaimed }))
}
