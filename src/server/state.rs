//! Application state for the HTTP server.

use crate::coordinator::PurchaseCoordinator;
use crate::store::RedisTicketStore;
use std::sync::Arc;

/// State shared across all HTTP handlers, cloned (cheaply) per request.
#[derive(Clone)]
pub struct AppState {
    /// Redis-backed reservation store, used directly by the inventory and
    /// health endpoints.
    pub store: RedisTicketStore,

    /// Purchase coordinator over the store.
    pub coordinator: Arc<PurchaseCoordinator<RedisTicketStore>>,
}

impl AppState {
    /// Creates the application state.
    #[must_use]
    pub fn new(
        store: RedisTicketStore,
        coordinator: Arc<PurchaseCoordinator<RedisTicketStore>>,
    ) -> Self {
        Self { store, coordinator }
    }
}
