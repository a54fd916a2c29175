//! Router configuration.

use super::state::AppState;
use crate::api::{health, inventory, purchase};
use axum::{
    Router,
    routing::{get, post},
};

/// Builds the Axum router for the service.
///
/// - `GET  /health` - store liveness
/// - `POST /preload/{class}` - seed tickets (trusted admin/dev operation)
/// - `POST /purchase/{class}` - reserve, debit, confirm
/// - `GET  /counts/{class}` - lifecycle set cardinalities
/// - `POST /reclaim/{class}?limit=L` - manual expired-lease reclaim
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/preload/:class", post(inventory::preload))
        .route("/purchase/:class", post(purchase::purchase))
        .route("/counts/:class", get(inventory::counts))
        .route("/reclaim/:class", post(inventory::reclaim))
        .with_state(state)
}
