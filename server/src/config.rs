//! Configuration management for the reservation server.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::service::ReservationPolicy;
use reserva_core::HoldDuration;
use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Hold policy and sweep configuration
    pub reservation: ReservationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Reservation policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    /// Hold applied when the caller does not request one (minutes)
    pub default_hold_minutes: u32,
    /// Upper bound on caller-requested holds (minutes)
    pub max_hold_minutes: u32,
    /// Per-order quantity cap
    pub max_per_order: u32,
    /// Interval between background expiry sweeps (seconds)
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables, defaulting anything
    /// missing or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("RESERVA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("RESERVA_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(4000),
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            },
            reservation: ReservationConfig {
                default_hold_minutes: env::var("RESERVA_DEFAULT_HOLD_MINUTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
                max_hold_minutes: env::var("RESERVA_MAX_HOLD_MINUTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
                max_per_order: env::var("RESERVA_MAX_PER_ORDER")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                sweep_interval_secs: env::var("RESERVA_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            },
        }
    }
}

impl ReservationConfig {
    /// The validation policy this configuration describes.
    #[must_use]
    pub const fn policy(&self) -> ReservationPolicy {
        ReservationPolicy {
            default_hold: HoldDuration::from_minutes(self.default_hold_minutes),
            max_hold: HoldDuration::from_minutes(self.max_hold_minutes),
            max_per_order: self.max_per_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_policy() {
        // Read defaults without touching the process environment.
        let config = Config::from_env();
        assert_eq!(config.reservation.default_hold_minutes, 30);
        assert_eq!(config.reservation.max_per_order, 10);
        assert_eq!(config.reservation.sweep_interval_secs, 60);
    }
}
