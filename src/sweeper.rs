//! Lease expiry sweepers.
//!
//! One background task per configured class returns abandoned reservations
//! to `available` in bounded batches. A sweeper must never die to a store
//! hiccup: errors are logged and the task tries again next interval. The
//! batch limit bounds both the atomic script's cost and how long an
//! abandoned lease can linger past its expiry.

use crate::config::ReservationConfig;
use crate::store::{RedisTicketStore, TicketStore};
use crate::types::ClassId;
use metrics::counter;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Spawns one sweeper task per configured class.
///
/// Tasks exit within one interval of `shutdown` firing.
#[must_use]
pub fn spawn_sweepers(
    store: RedisTicketStore,
    config: &ReservationConfig,
    shutdown: &broadcast::Sender<()>,
) -> Vec<JoinHandle<()>> {
    config
        .sweep_classes
        .iter()
        .map(|&class| {
            spawn_sweeper(
                store.clone(),
                class,
                config.sweep_interval(),
                config.sweep_batch_limit,
                shutdown.subscribe(),
            )
        })
        .collect()
}

/// Spawns the sweeper loop for a single class.
pub fn spawn_sweeper(
    store: RedisTicketStore,
    class: ClassId,
    interval: Duration,
    batch_limit: usize,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(class = %class, ?interval, batch_limit, "sweeper started");
        loop {
            match store.reclaim_expired(class, batch_limit).await {
                Ok(reclaimed) if !reclaimed.is_empty() => {
                    counter!("boxoffice_tickets_reclaimed_total")
                        .increment(reclaimed.len() as u64);
                    tracing::info!(
                        class = %class,
                        reclaimed = reclaimed.len(),
                        "returned expired leases to available"
                    );
                }
                Ok(_) => {}
                // Swallowed: the wait below doubles as the backoff.
                Err(e) => {
                    tracing::warn!(class = %class, error = %e, "sweep failed; will retry");
                }
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        tracing::debug!(class = %class, "sweeper stopped");
    })
}
