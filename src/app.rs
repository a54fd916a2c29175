//! Application wiring and lifecycle.
//!
//! Startup order: metrics exporter, store connection (which registers the
//! transition scripts), a verifying `PING`, sweepers, HTTP listener. On
//! shutdown the HTTP server drains first, then the sweepers are signalled
//! and waited out, and only then does the store client drop.

use crate::config::Config;
use crate::coordinator::PurchaseCoordinator;
use crate::metrics::register_metrics;
use crate::payment::MockPaymentGateway;
use crate::server::{AppState, build_router};
use crate::store::RedisTicketStore;
use crate::sweeper::spawn_sweepers;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Fully wired application, ready to run.
pub struct Application {
    /// TCP listener bound to the configured address.
    listener: tokio::net::TcpListener,
    /// Router with all HTTP routes.
    router: axum::Router,
    /// Per-class sweeper tasks.
    sweepers: Vec<JoinHandle<()>>,
    /// Shutdown signal broadcaster for the sweepers.
    shutdown_tx: broadcast::Sender<()>,
    /// Bound on how long shutdown waits for each sweeper.
    shutdown_timeout: Duration,
}

impl Application {
    /// Connects all resources and binds the listener.
    ///
    /// # Errors
    ///
    /// Fails when the metrics exporter cannot start, the store is
    /// unreachable, or the address cannot be bound.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        register_metrics();
        let metrics_addr: SocketAddr =
            format!("{}:{}", config.server.metrics_host, config.server.metrics_port)
                .parse()
                .context("invalid metrics address")?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("failed to install metrics exporter")?;

        let store = RedisTicketStore::connect(&config.redis.url).await?;
        store.ping().await?;
        tracing::info!(url = %config.redis.url, "connected to Redis");

        let gateway = MockPaymentGateway::shared();
        let coordinator = Arc::new(PurchaseCoordinator::new(
            store.clone(),
            gateway,
            &config.reservation,
        ));

        let (shutdown_tx, _) = broadcast::channel(1);
        let sweepers = spawn_sweepers(store.clone(), &config.reservation, &shutdown_tx);
        tracing::info!(
            classes = config.reservation.sweep_classes.len(),
            interval_secs = config.reservation.sweep_interval_secs,
            batch_limit = config.reservation.sweep_batch_limit,
            "sweepers started"
        );

        let router = build_router(AppState::new(store, coordinator));

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        tracing::info!(%addr, "listening");

        Ok(Self {
            listener,
            router,
            sweepers,
            shutdown_tx,
            shutdown_timeout: Duration::from_secs(config.server.shutdown_timeout),
        })
    }

    /// Serves HTTP until a shutdown signal, then stops the sweepers.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP server errors out.
    pub async fn run(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")?;

        // HTTP is drained; now stop the sweepers and wait them out.
        let _ = self.shutdown_tx.send(());
        for handle in self.sweepers {
            if tokio::time::timeout(self.shutdown_timeout, handle)
                .await
                .is_err()
            {
                tracing::warn!("sweeper did not stop within the shutdown timeout");
            }
        }

        tracing::info!("shutdown complete");
        Ok(())
    }
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to listen for ctrl-c; shutting down immediately");
    }
    tracing::info!("shutdown signal received");
}
