//! Payment collaborator interface.
//!
//! The service treats payment as a single debit call with bounded latency.
//! Any deviation (gateway error, timeout, or a plain "no") is handled
//! identically by the purchase coordinator: the reservation is rolled back
//! and the buyer sees a decline.

use crate::types::PlayerId;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Payment gateway result.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Payment gateway failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway did not answer in time.
    #[error("gateway timeout")]
    Timeout,
    /// Any other gateway-side failure.
    #[error("payment error: {0}")]
    Other(String),
}

/// Abstraction over the wallet/payment processor.
///
/// Real integrations (Stripe, an internal wallet service, ...) implement this
/// trait; the coordinator only ever sees "did the debit go through".
pub trait PaymentGateway: Send + Sync {
    /// Attempts to debit `amount` from the player's wallet.
    ///
    /// `Ok(true)` means the money moved; `Ok(false)` and `Err(_)` are both
    /// declines from the coordinator's point of view.
    fn debit(
        &self,
        player_id: &PlayerId,
        amount: u64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<bool>> + Send>>;
}

/// Development gateway with a short simulated network delay.
///
/// The default construction approves every debit, which is the wired
/// behavior until a real integration replaces it; [`MockPaymentGateway::declining`]
/// builds one that refuses everything, for exercising the rollback path.
#[derive(Clone, Debug)]
pub struct MockPaymentGateway {
    /// Answer given to every debit.
    approve: bool,
    /// Simulated gateway latency.
    delay: Duration,
}

impl MockPaymentGateway {
    /// Gateway that approves every debit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            approve: true,
            delay: Duration::from_millis(10),
        }
    }

    /// Gateway that declines every debit.
    #[must_use]
    pub const fn declining() -> Self {
        Self {
            approve: false,
            delay: Duration::from_millis(10),
        }
    }

    /// Overrides the simulated latency.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Arc-wrapped instance for sharing across tasks.
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn debit(
        &self,
        player_id: &PlayerId,
        amount: u64,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<bool>> + Send>> {
        let player = player_id.clone();
        let approve = self.approve;
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(player = %player, amount, approve, "mock debit answered");
            Ok(approve)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_gateway_approves_by_default() {
        let gateway = MockPaymentGateway::new();
        let player = PlayerId::new("p1");
        assert_eq!(gateway.debit(&player, 50).await, Ok(true));
    }

    #[tokio::test]
    async fn declining_gateway_refuses() {
        let gateway = MockPaymentGateway::declining();
        let player = PlayerId::new("p1");
        assert_eq!(gateway.debit(&player, 50).await, Ok(false));
    }
}
