//! Delivery chaos.
//!
//! The engine decides how a single delivery is disturbed: duplicated,
//! delayed, or dropped. It never looks at payloads. Batch reordering is a
//! separate roll applied by scenarios to a whole list of pending emits.

use crate::config::{ConfigError, parse_var, probability};
use crate::metrics;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fixed latency added to every delayed delivery.
pub const BASE_DELAY_MS: u64 = 100;

/// Probabilities and bounds for delivery disruption.
///
/// Probabilities are in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChaosConfig {
    /// Chance a delivery is sent more than once
    pub duplicate_probability: f64,
    /// Upper bound on extra copies
    pub max_duplicates: u32,
    /// Chance a delivery is held back
    pub delay_probability: f64,
    /// Upper bound on the random part of a delay
    pub max_delay_ms: u64,
    /// Chance a batch is shuffled
    pub reorder_probability: f64,
    /// Chance a delivery is dropped
    pub failure_probability: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            duplicate_probability: 0.15,
            max_duplicates: 2,
            delay_probability: 0.20,
            max_delay_ms: 3000,
            reorder_probability: 0.15,
            failure_probability: 0.10,
        }
    }
}

impl ChaosConfig {
    /// No disruption at all
    #[must_use]
    pub const fn none() -> Self {
        Self {
            duplicate_probability: 0.0,
            max_duplicates: 0,
            delay_probability: 0.0,
            max_delay_ms: 0,
            reorder_probability: 0.0,
            failure_probability: 0.0,
        }
    }

    /// Load from `CHAOS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparseable values or probabilities outside
    /// `[0.0, 1.0]`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// `CHAOS_ENABLED=false` yields [`Self::none`]; otherwise each knob
    /// falls back to its default when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparseable values or probabilities outside
    /// `[0.0, 1.0]`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if !parse_var(&lookup, "CHAOS_ENABLED")?.unwrap_or(true) {
            return Ok(Self::none());
        }

        let defaults = Self::default();
        Ok(Self {
            duplicate_probability: probability(&lookup, "CHAOS_DUPLICATE_PROBABILITY")?
                .unwrap_or(defaults.duplicate_probability),
            max_duplicates: parse_var(&lookup, "CHAOS_MAX_DUPLICATES")?
                .unwrap_or(defaults.max_duplicates),
            delay_probability: probability(&lookup, "CHAOS_DELAY_PROBABILITY")?
                .unwrap_or(defaults.delay_probability),
            max_delay_ms: parse_var(&lookup, "CHAOS_MAX_DELAY_MS")?
                .unwrap_or(defaults.max_delay_ms),
            reorder_probability: probability(&lookup, "CHAOS_REORDER_PROBABILITY")?
                .unwrap_or(defaults.reorder_probability),
            failure_probability: probability(&lookup, "CHAOS_FAILURE_PROBABILITY")?
                .unwrap_or(defaults.failure_probability),
        })
    }
}

/// How one delivery is disturbed. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChaosDecision {
    /// Send extra copies
    pub duplicate: bool,
    /// Number of extra copies, at least 1 when `duplicate`
    pub duplicate_count: u32,
    /// Hold the delivery back
    pub delayed: bool,
    /// Delay length when `delayed`
    pub delay_ms: u64,
    /// Drop the delivery
    pub fail: bool,
}

impl ChaosDecision {
    /// Undisturbed delivery
    #[must_use]
    pub const fn clean() -> Self {
        Self {
            duplicate: false,
            duplicate_count: 0,
            delayed: false,
            delay_ms: 0,
            fail: false,
        }
    }

    /// Whether nothing is disturbed
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.duplicate && !self.delayed && !self.fail
    }

    /// Delay to apply, if any
    #[must_use]
    pub const fn delay(&self) -> Option<Duration> {
        if self.delayed {
            Some(Duration::from_millis(self.delay_ms))
        } else {
            None
        }
    }

    /// Extra copies to send after the original
    #[must_use]
    pub const fn extra_copies(&self) -> u32 {
        if self.duplicate { self.duplicate_count } else { 0 }
    }

    /// Metric labels for the effects in this decision
    #[must_use]
    pub fn effects(&self) -> Vec<&'static str> {
        if self.is_clean() {
            return vec!["clean"];
        }
        [
            (self.duplicate, "duplicate"),
            (self.delayed, "delay"),
            (self.fail, "fail"),
        ]
        .into_iter()
        .filter_map(|(on, label)| on.then_some(label))
        .collect()
    }
}

impl fmt::Display for ChaosDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("CLEAN");
        }
        let mut parts = Vec::with_capacity(3);
        if self.duplicate {
            parts.push(format!("DUP(x{})", self.duplicate_count));
        }
        if self.delayed {
            parts.push(format!("DELAY({}ms)", self.delay_ms));
        }
        if self.fail {
            parts.push("FAIL".to_string());
        }
        f.write_str(&parts.join(" "))
    }
}

/// Random source of [`ChaosDecision`]s.
///
/// Seed it for reproducible runs.
#[derive(Debug)]
pub struct ChaosEngine {
    config: ChaosConfig,
    rng: Mutex<StdRng>,
}

impl ChaosEngine {
    /// Engine seeded from OS entropy
    #[must_use]
    pub fn new(config: ChaosConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Engine with a fixed seed
    #[must_use]
    pub fn seeded(config: ChaosConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Engine that never disturbs anything
    #[must_use]
    pub fn disabled() -> Self {
        Self::seeded(ChaosConfig::none(), 0)
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Decide the fate of one delivery.
    ///
    /// Duplicate, delay and fail are sampled independently, in that order.
    pub fn decide(&self) -> ChaosDecision {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let config = &self.config;

        let duplicate = roll(&mut *rng, config.duplicate_probability);
        let duplicate_count = if duplicate {
            1 + below(&mut *rng, u64::from(config.max_duplicates))
                .try_into()
                .unwrap_or(0_u32)
        } else {
            0
        };

        let delayed = roll(&mut *rng, config.delay_probability);
        let delay_ms = if delayed {
            BASE_DELAY_MS + below(&mut *rng, config.max_delay_ms)
        } else {
            0
        };

        let fail = roll(&mut *rng, config.failure_probability);
        drop(rng);

        let decision = ChaosDecision {
            duplicate,
            duplicate_count,
            delayed,
            delay_ms,
            fail,
        };
        for effect in decision.effects() {
            metrics::record_chaos_effect(effect);
        }
        decision
    }

    /// Shuffle a batch with probability `reorder_probability`.
    ///
    /// Returns the batch untouched otherwise.
    pub fn maybe_reorder<T>(&self, mut batch: Vec<T>) -> Vec<T> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if roll(&mut *rng, self.config.reorder_probability) {
            batch.shuffle(&mut *rng);
            tracing::debug!(len = batch.len(), "Batch reordered");
            metrics::record_chaos_effect("reorder");
        }
        batch
    }
}

fn roll(rng: &mut impl Rng, probability: f64) -> bool {
    probability > 0.0 && rng.gen_range(0.0..1.0) < probability
}

// Uniform in [0, bound); 0 for an empty range.
fn below(rng: &mut impl Rng, bound: u64) -> u64 {
    if bound == 0 { 0 } else { rng.gen_range(0..bound) }
}
