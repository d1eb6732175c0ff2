//! Configuration management for the broker.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Broker configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Ingestion settings
    pub ingestion: IngestionConfig,
    /// Logging and metrics settings
    pub observability: ObservabilityConfig,
}

/// Ingestion configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum failed events held in memory before the oldest is dropped
    pub failed_event_capacity: usize,
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Whether to install the Prometheus recorder
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables, after reading `.env` if present.
    #[must_use]
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            ingestion: IngestionConfig {
                failed_event_capacity: lookup("BROKER_FAILED_EVENT_CAPACITY")
                    .and_then(|s| s.parse().ok())
                    .filter(|capacity| *capacity > 0)
                    .unwrap_or(1000),
            },
            observability: ObservabilityConfig {
                log_filter: lookup("BROKER_LOG_FILTER")
                    .unwrap_or_else(|| "roomsync=info".to_string()),
                metrics_enabled: lookup("BROKER_METRICS_ENABLED")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.ingestion.failed_event_capacity, 1000);
        assert_eq!(config.observability.log_filter, "roomsync=info");
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("BROKER_FAILED_EVENT_CAPACITY", "0"),
            ("BROKER_LOG_FILTER", "roomsync=debug"),
            ("BROKER_METRICS_ENABLED", "false"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.ingestion.failed_event_capacity, 1000);
        assert_eq!(config.observability.log_filter, "roomsync=debug");
        assert!(!config.observability.metrics_enabled);
    }
}
