//! Configuration management for the reservation service.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::types::ClassId;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Reservation behavior configuration.
    pub reservation: ReservationConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Metrics server host (for Prometheus scraping).
    pub metrics_host: String,
    /// Metrics server port.
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds.
    pub shutdown_timeout: u64,
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
}

/// Reservation behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    /// Lease duration for reserved tickets, in seconds.
    pub lease_seconds: u64,
    /// Seconds between sweeper passes over a class.
    pub sweep_interval_secs: u64,
    /// Maximum leases reclaimed by one atomic sweep.
    pub sweep_batch_limit: usize,
    /// Classes covered by background sweepers. Classes not listed stay
    /// correct, but their abandoned leases persist until a manual reclaim.
    pub sweep_classes: Vec<ClassId>,
    /// Price charged per ticket.
    pub unit_price: u64,
    /// Payment gateway timeout, in seconds.
    pub payment_timeout_secs: u64,
}

impl ReservationConfig {
    /// Sweeper pass interval as a [`Duration`].
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Payment timeout as a [`Duration`].
    #[must_use]
    pub const fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }
}

impl Config {
    /// Loads configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                metrics_host: env::var("METRICS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                metrics_port: env::var("METRICS_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(9090),
                shutdown_timeout: env::var("SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            reservation: ReservationConfig {
                lease_seconds: env::var("LEASE_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
                sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1),
                sweep_batch_limit: env::var("SWEEP_BATCH_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
                sweep_classes: env::var("SWEEP_CLASSES")
                    .ok()
                    .map_or_else(default_sweep_classes, |raw| parse_classes(&raw)),
                unit_price: env::var("UNIT_PRICE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                payment_timeout_secs: env::var("PAYMENT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
        }
    }
}

/// Classes swept when `SWEEP_CLASSES` is not set.
fn default_sweep_classes() -> Vec<ClassId> {
    [90, 75, 60, 45, 30].into_iter().map(ClassId::new).collect()
}

/// Parses a comma-separated class list; entries that do not parse are skipped.
fn parse_classes(raw: &str) -> Vec<ClassId> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .map(ClassId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classes_skips_garbage() {
        let classes = parse_classes("90, 75,not-a-class, 60");
        assert_eq!(
            classes,
            vec![ClassId::new(90), ClassId::new(75), ClassId::new(60)]
        );
    }

    #[test]
    fn default_sweep_classes_match_the_seeded_set() {
        assert_eq!(default_sweep_classes().len(), 5);
        assert!(default_sweep_classes().contains(&ClassId::new(30)));
    }

    #[test]
    fn duration_helpers_convert_seconds() {
        let cfg = ReservationConfig {
            lease_seconds: 30,
            sweep_interval_secs: 2,
            sweep_batch_limit: 500,
            sweep_classes: vec![],
            unit_price: 10,
            payment_timeout_secs: 5,
        };
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(2));
        assert_eq!(cfg.payment_timeout(), Duration::from_secs(5));
    }
}
