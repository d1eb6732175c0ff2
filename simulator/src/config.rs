//! Configuration management for the simulator binary.
//!
//! Loads configuration from environment variables. Unset variables take
//! their defaults; set but invalid variables are errors.

use crate::chaos::ChaosConfig;
use crate::scenario::ScenarioKind;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A variable is set but does not parse
    #[error("{key}={value} is not a valid value")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
    /// A probability outside `[0.0, 1.0]`
    #[error("{key}={value} must be between 0.0 and 1.0")]
    ProbabilityOutOfRange {
        /// Variable name
        key: &'static str,
        /// Parsed value
        value: f64,
    },
    /// `SIMULATOR_SCENARIO` names no known scenario
    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),
}

/// Simulator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Scenarios to run, in order
    pub scenarios: Vec<ScenarioKind>,
    /// Chaos seed; entropy when unset
    pub seed: Option<u64>,
    /// Delivery disruption
    pub chaos: ChaosConfig,
    /// In-process broker settings
    pub broker: roomsync_broker::Config,
}

impl Config {
    /// Load configuration from environment variables, after reading `.env` if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an invalid value.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let scenarios = match lookup("SIMULATOR_SCENARIO") {
            None => ScenarioKind::ALL.to_vec(),
            Some(value) if value.trim().eq_ignore_ascii_case("all") => ScenarioKind::ALL.to_vec(),
            Some(value) => value
                .split(',')
                .map(|name| {
                    ScenarioKind::from_name(name)
                        .ok_or_else(|| ConfigError::UnknownScenario(name.trim().to_string()))
                })
                .collect::<Result<_, _>>()?,
        };

        Ok(Self {
            scenarios,
            seed: parse_var(&lookup, "SIMULATOR_SEED")?,
            chaos: ChaosConfig::from_lookup(&lookup)?,
            broker: roomsync_broker::Config::from_lookup(&lookup),
        })
    }
}

/// Parse an optional variable; unset and blank are `None`.
pub(crate) fn parse_var<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        _ => Ok(None),
    }
}

/// Parse an optional probability in `[0.0, 1.0]`.
pub(crate) fn probability(
    lookup: impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<f64>, ConfigError> {
    match parse_var::<f64>(lookup, key)? {
        Some(value) if !(0.0..=1.0).contains(&value) => {
            Err(ConfigError::ProbabilityOutOfRange { key, value })
        },
        other => Ok(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| vars.get(key).map(ToString::to_string)
    }

    #[test]
    fn defaults_run_everything_with_default_chaos() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config.scenarios, ScenarioKind::ALL.to_vec());
        assert_eq!(config.seed, None);
        assert_eq!(config.chaos, ChaosConfig::default());
        assert_eq!(config.broker, roomsync_broker::Config::default());
    }

    #[test]
    fn scenario_list_and_chaos_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SIMULATOR_SCENARIO", "simple-booking, MixedChaos"),
            ("SIMULATOR_SEED", "7"),
            ("CHAOS_FAILURE_PROBABILITY", "0"),
            ("CHAOS_MAX_DELAY_MS", "250"),
            ("BROKER_FAILED_EVENT_CAPACITY", "10"),
        ]))
        .unwrap();

        assert_eq!(
            config.scenarios,
            vec![ScenarioKind::SimpleBooking, ScenarioKind::MixedChaos]
        );
        assert_eq!(config.seed, Some(7));
        assert!(config.chaos.failure_probability.abs() < f64::EPSILON);
        assert_eq!(config.chaos.max_delay_ms, 250);
        assert_eq!(config.broker.ingestion.failed_event_capacity, 10);
    }

    #[test]
    fn chaos_can_be_switched_off() {
        let config = Config::from_lookup(lookup(&[
            ("CHAOS_ENABLED", "false"),
            ("CHAOS_FAILURE_PROBABILITY", "0.9"),
        ]))
        .unwrap();
        assert_eq!(config.chaos, ChaosConfig::none());
    }

    #[test]
    fn bad_values_are_reported() {
        assert_eq!(
            Config::from_lookup(lookup(&[("SIMULATOR_SCENARIO", "Nope")])),
            Err(ConfigError::UnknownScenario("Nope".to_string()))
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("SIMULATOR_SEED", "seven")])),
            Err(ConfigError::InvalidValue {
                key: "SIMULATOR_SEED",
                value: "seven".to_string()
            })
        );
        assert!(matches!(
            Config::from_lookup(lookup(&[("CHAOS_DELAY_PROBABILITY", "1.5")])),
            Err(ConfigError::ProbabilityOutOfRange { key: "CHAOS_DELAY_PROBABILITY", .. })
        ));
    }
}
