//! Reproducible multi-platform scenarios.
//!
//! A scenario books and cancels on several platforms at once and emits what
//! they issue through a [`ScenarioContext`], which applies delivery chaos.
//! The [`ScenarioRunner`] gives each run a fresh correlation id and returns a
//! [`ScenarioResult`] carrying the run's report.

use crate::platform::PlatformError;
use crate::report::ExecutionReport;
use chrono::NaiveDate;
use roomsync_broker::translator::time::ISO_DATE;
use roomsync_core::event::{InvalidStayRange, StayRange};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// The five built-in scenarios
pub mod catalog;

/// Per-run emit context
pub mod context;

/// Scenario runner
pub mod runner;

pub use catalog::{DelayedDelivery, DuplicateRetry, MixedChaos, ReorderedCancel, SimpleBooking};
pub use context::ScenarioContext;
pub use runner::ScenarioRunner;

/// Errors that abort a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// A scenario date did not parse
    #[error("invalid scenario date: {0}")]
    InvalidDate(#[from] chrono::ParseError),
    /// Scenario dates are out of order
    #[error(transparent)]
    InvalidStay(#[from] InvalidStayRange),
    /// A platform could not issue a payload
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// A cross-platform simulation.
///
/// # Dyn Compatibility
///
/// Returns `Pin<Box<dyn Future>>` so runners can take `&dyn Scenario`.
pub trait Scenario: Send + Sync {
    /// Display name
    fn name(&self) -> &'static str;

    /// Book, cancel and emit through `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if a payload cannot be produced. Delivery
    /// problems are not errors; they are recorded in the report.
    fn execute<'a>(
        &'a self,
        ctx: &'a ScenarioContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScenarioError>> + Send + 'a>>;
}

/// Built-in scenarios by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    /// Same dates booked on all three platforms
    SimpleBooking,
    /// Retried bookings from two platforms
    DuplicateRetry,
    /// Book and cancel pairs delivered in shuffled order
    ReorderedCancel,
    /// Batch-lagged deliveries from the compact-date platform
    DelayedDelivery,
    /// Every kind of chaos at once
    MixedChaos,
}

impl ScenarioKind {
    /// All scenarios, in run order
    pub const ALL: [Self; 5] = [
        Self::SimpleBooking,
        Self::DuplicateRetry,
        Self::ReorderedCancel,
        Self::DelayedDelivery,
        Self::MixedChaos,
    ];

    /// Display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SimpleBooking => "SimpleBooking",
            Self::DuplicateRetry => "DuplicateRetry",
            Self::ReorderedCancel => "ReorderedCancel",
            Self::DelayedDelivery => "DelayedDelivery",
            Self::MixedChaos => "MixedChaos",
        }
    }

    /// Room code the scenario books
    #[must_use]
    pub const fn room(self) -> &'static str {
        match self {
            Self::SimpleBooking => "R-101",
            Self::DuplicateRetry => "R-201",
            Self::ReorderedCancel => "R-301",
            Self::DelayedDelivery => "R-401",
            Self::MixedChaos => "R-501",
        }
    }

    /// Resolve a name, ignoring case, `-` and `_`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(&wanted))
    }

    /// Instantiate with default settings
    #[must_use]
    pub fn scenario(self) -> Box<dyn Scenario> {
        match self {
            Self::SimpleBooking => Box::new(SimpleBooking),
            Self::DuplicateRetry => Box::new(DuplicateRetry),
            Self::ReorderedCancel => Box::new(ReorderedCancel),
            Self::DelayedDelivery => Box::new(DelayedDelivery::default()),
            Self::MixedChaos => Box::new(MixedChaos),
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario name
    pub scenario: &'static str,
    /// Whether the scenario ran to completion
    pub success: bool,
    /// Everything the run sent
    pub report: ExecutionReport,
    /// Why the scenario aborted
    pub error: Option<String>,
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => writeln!(f, "[{}] completed", self.scenario)?,
            Some(error) => writeln!(f, "[{}] aborted: {error}", self.scenario)?,
        }
        write!(f, "{}", self.report)
    }
}

/// Stay from two `yyyy-MM-dd` dates.
///
/// # Errors
///
/// Returns [`ScenarioError`] for unparseable or out-of-order dates.
pub fn stay(check_in: &str, check_out: &str) -> Result<StayRange, ScenarioError> {
    Ok(StayRange::new(
        NaiveDate::parse_from_str(check_in, ISO_DATE)?,
        NaiveDate::parse_from_str(check_out, ISO_DATE)?,
    )?)
}
