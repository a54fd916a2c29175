//! Purchase coordination.
//!
//! A purchase is reserve → debit → confirm, with a rollback on every failure
//! edge so no ticket is ever stranded in `reserved`:
//!
//! ```text
//!           reserve_n
//!   (none) ───────────► HELD
//!                         │ debit ok            debit declined / error / timeout
//!              ┌──────────┴──────────┐──────────────────────┐
//!              ▼                     ▼                      ▼
//!           confirm          rollback (underfill)        rollback
//!              │ all in sold?        │                      │
//!          yes │  no → rollback      ▼                      ▼
//!              ▼                 AVAILABLE              AVAILABLE
//!            SOLD
//! ```
//!
//! The reserve-to-finalize window is bounded only by the lease: if the
//! process dies mid-flight, the sweeper returns the batch to `available`
//! within `lease_seconds` plus one sweep interval.

use crate::config::ReservationConfig;
use crate::error::{ReservationError, Result};
use crate::payment::PaymentGateway;
use crate::store::TicketStore;
use crate::types::{ClassId, PlayerId, ReservedTicket, TicketId};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

/// Coordinates full purchases against the store and the payment gateway.
pub struct PurchaseCoordinator<S> {
    store: S,
    gateway: Arc<dyn PaymentGateway>,
    unit_price: u64,
    lease_seconds: u64,
    payment_timeout: Duration,
}

impl<S: TicketStore> PurchaseCoordinator<S> {
    /// Creates a coordinator over `store` and `gateway` with the configured
    /// lease, pricing, and payment timeout.
    pub fn new(store: S, gateway: Arc<dyn PaymentGateway>, config: &ReservationConfig) -> Self {
        Self {
            store,
            gateway,
            unit_price: config.unit_price,
            lease_seconds: config.lease_seconds,
            payment_timeout: config.payment_timeout(),
        }
    }

    /// Executes a purchase of `count` tickets for `player`.
    ///
    /// On success the returned tickets are terminally sold. On any error the
    /// reservation has already been rolled back; the buyer holds nothing.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::InvalidRequest`] when `count` is zero.
    /// - [`ReservationError::InsufficientInventory`] when fewer than `count`
    ///   tickets were available.
    /// - [`ReservationError::PaymentDeclined`] when the debit did not go
    ///   through.
    /// - [`ReservationError::FinalizeMismatch`] when confirm did not land
    ///   every id in `sold` (lease expired mid-purchase).
    /// - [`ReservationError::StoreUnavailable`] on store failure; the lease
    ///   guarantees eventual reclaim of anything left reserved.
    pub async fn purchase(
        &self,
        class: ClassId,
        player: &PlayerId,
        count: usize,
    ) -> Result<Vec<ReservedTicket>> {
        if count == 0 {
            return Err(ReservationError::InvalidRequest(
                "count must be at least 1".to_string(),
            ));
        }

        // Advisory fast path for the clearly-sold-out case. The authoritative
        // check is the underfill handling after reserve_n.
        let available = self.store.available_count(class).await?;
        if available < count as u64 {
            counter!("boxoffice_purchases_total", "status" => "insufficient").increment(1);
            return Err(ReservationError::InsufficientInventory {
                available,
                requested: count,
            });
        }

        let reserved = self.store.reserve_n(class, count, self.lease_seconds).await?;
        let ids: Vec<TicketId> = reserved.iter().map(|t| t.id.clone()).collect();

        if reserved.len() < count {
            self.store.rollback(class, &ids).await?;
            counter!("boxoffice_purchases_total", "status" => "insufficient").increment(1);
            return Err(ReservationError::InsufficientInventory {
                available: reserved.len() as u64,
                requested: count,
            });
        }

        let amount = self.unit_price.saturating_mul(count as u64);
        if !self.debit(player, amount).await {
            self.store.rollback(class, &ids).await?;
            counter!("boxoffice_purchases_total", "status" => "declined").increment(1);
            return Err(ReservationError::PaymentDeclined);
        }

        let acked = self.store.confirm(class, &ids).await?;
        // The confirm script acknowledges its argument count; whether every
        // id actually landed in `sold` is answered by membership.
        let confirmed = self.store.sold_count(class, &ids).await?;
        if acked != ids.len() || confirmed != ids.len() {
            self.store.rollback(class, &ids).await?;
            counter!("boxoffice_purchases_total", "status" => "mismatch").increment(1);
            tracing::error!(
                class = %class,
                player = %player,
                expected = ids.len(),
                confirmed,
                "confirm did not land every ticket in sold; rolled back"
            );
            return Err(ReservationError::FinalizeMismatch {
                expected: ids.len(),
                confirmed,
            });
        }

        counter!("boxoffice_purchases_total", "status" => "purchased").increment(1);
        counter!("boxoffice_tickets_sold_total").increment(count as u64);
        tracing::info!(
            class = %class,
            player = %player,
            count,
            amount,
            "purchase confirmed"
        );
        Ok(reserved)
    }

    /// Runs the debit under the payment timeout. Gateway errors, timeouts,
    /// and negative answers all come back as `false`.
    async fn debit(&self, player: &PlayerId, amount: u64) -> bool {
        match tokio::time::timeout(self.payment_timeout, self.gateway.debit(player, amount)).await
        {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                tracing::info!(player = %player, amount, "payment declined");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(player = %player, amount, error = %e, "payment errored");
                false
            }
            Err(_) => {
                tracing::warn!(player = %player, amount, "payment timed out");
                false
            }
        }
    }
}
