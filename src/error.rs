//! Error types for reservation operations.

use thiserror::Error;

/// Result type alias for reservation operations.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// Error taxonomy for the reservation service.
///
/// Every variant that reports a failed purchase guarantees that any partial
/// reservation has already been rolled back before the error surfaces, so a
/// caller never needs to clean up inventory state itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Fewer tickets were available than requested.
    #[error("only {available} tickets available, but {requested} requested")]
    InsufficientInventory {
        /// Tickets that were actually available.
        available: u64,
        /// Tickets the buyer asked for.
        requested: usize,
    },

    /// The payment collaborator declined, errored, or timed out.
    #[error("payment declined")]
    PaymentDeclined,

    /// Confirm did not land every reserved id in `sold`.
    ///
    /// Indicates the lease expired between reserve and confirm, or a sweeper
    /// reclaim raced the purchase. The batch has been rolled back.
    #[error("confirmed {confirmed} of {expected} reserved tickets")]
    FinalizeMismatch {
        /// Ids the coordinator expected to confirm.
        expected: usize,
        /// Ids actually present in `sold` afterwards.
        confirmed: usize,
    },

    /// A request failed validation before touching the store.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The store could not be reached or rejected a command.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A pool payload could not be decoded as JSON.
    #[error("corrupt payload for ticket {0}")]
    CorruptPayload(String),
}

impl ReservationError {
    /// Returns `true` when the failure is the buyer's to resolve rather than
    /// an operational fault.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientInventory { .. } | Self::PaymentDeclined | Self::InvalidRequest(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_inventory_names_both_counts() {
        let err = ReservationError::InsufficientInventory {
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "only 2 tickets available, but 5 requested"
        );
    }

    #[test]
    fn user_error_classification() {
        assert!(ReservationError::PaymentDeclined.is_user_error());
        assert!(ReservationError::InvalidRequest("count must be at least 1".into()).is_user_error());
        assert!(!ReservationError::StoreUnavailable("connection refused".into()).is_user_error());
        assert!(
            !ReservationError::FinalizeMismatch {
                expected: 3,
                confirmed: 2
            }
            .is_user_error()
        );
    }
}
