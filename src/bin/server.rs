//! Reservation service server binary.
//!
//! ```bash
//! # Start Redis
//! docker run -d -p 6379:6379 redis:7-alpine
//!
//! # Run the server
//! cargo run --bin server
//! ```

use boxoffice::Config;
use boxoffice::app::Application;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boxoffice=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        redis = %config.redis.url,
        lease_seconds = config.reservation.lease_seconds,
        "configuration loaded"
    );

    let app = Application::build(config).await?;
    app.run().await
}
