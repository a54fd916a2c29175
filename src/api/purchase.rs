//! Purchase endpoint.

use crate::server::{ApiError, AppState};
use crate::types::{ClassId, PlayerId};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

/// Request body for `POST /purchase/{class}`.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Buyer identifier, passed through to the payment gateway.
    pub player_id: String,
    /// Number of tickets to buy (defaults to 1).
    #[serde(default = "default_count")]
    pub count: usize,
}

const fn default_count() -> usize {
    1
}

/// Response body for a successful purchase.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// Always `"purchased"`.
    pub status: &'static str,
    /// Payloads of the purchased tickets, exactly as seeded.
    pub tickets: Vec<serde_json::Value>,
}

/// Buys `count` tickets of a class for a player.
///
/// # Errors
///
/// 409 when inventory is insufficient or finalization mismatched, 402 when
/// payment is declined, 400 for `count = 0`, 503 when the store is down.
pub async fn purchase(
    Path(class): Path<u32>,
    State(state): State<AppState>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let player = PlayerId::new(req.player_id);
    let tickets = state
        .coordinator
        .purchase(ClassId::new(class), &player, req.count)
        .await?;

    Ok(Json(PurchaseResponse {
        status: "purchased",
        tickets: tickets
            .into_iter()
            .map(|t| t.payload.unwrap_or(serde_json::Value::Null))
            .collect(),
    }))
}
