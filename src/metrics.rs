//! Business metrics for the reservation service.
//!
//! # Exported metrics
//!
//! - `boxoffice_purchases_total{status}` - purchase attempts by outcome
//!   (purchased, insufficient, declined, mismatch)
//! - `boxoffice_tickets_sold_total` - tickets moved to `sold` by confirmed
//!   purchases
//! - `boxoffice_tickets_reclaimed_total` - expired leases returned to
//!   `available` by the sweepers

use metrics::describe_counter;

/// Registers descriptions for all business metrics.
///
/// Call once at application startup, before any metrics are recorded.
pub fn register_metrics() {
    describe_counter!(
        "boxoffice_purchases_total",
        "Purchase attempts by outcome (purchased, insufficient, declined, mismatch)"
    );
    describe_counter!(
        "boxoffice_tickets_sold_total",
        "Tickets moved to sold by confirmed purchases"
    );
    describe_counter!(
        "boxoffice_tickets_reclaimed_total",
        "Expired leases returned to available by the sweepers"
    );

    tracing::debug!("business metrics registered");
}
