//! # Roomsync Simulator
//!
//! Plays the three upstream platforms against a broker and disturbs delivery
//! the way real webhooks get disturbed: duplicated, delayed, dropped and
//! reordered.
//!
//! ## Pipeline
//!
//! ```text
//! Scenario
//!   → PlatformSimulator   (book / cancel, native payload)
//!   → ScenarioContext     (fresh event id, ChaosEngine::decide)
//!   → delivery::plan      (Effect<Delivery>)
//!   → EffectExecutor      (delay, then original, then copies)
//!   → EventSender         (envelope + headers → broker)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let sender = Arc::new(InProcessSender::new(broker.router()));
//! let runner = ScenarioRunner::new(sender, Arc::new(ChaosEngine::new(ChaosConfig::default())), clock, ids);
//!
//! let result = runner.run(&SimpleBooking).await;
//! println!("{result}");
//! ```

/// Delivery chaos engine
pub mod chaos;

/// Configuration management
pub mod config;

/// Chaos-aware delivery plans
pub mod delivery;

/// Simulator metrics
pub mod metrics;

/// Upstream platform simulators
pub mod platform;

/// Execution reports
pub mod report;

/// Scenarios and the runner
pub mod scenario;

/// Outbound event delivery
pub mod sender;

pub use chaos::{ChaosConfig, ChaosDecision, ChaosEngine};
pub use config::{Config, ConfigError};
pub use platform::{Issued, PlatformSimulator, Platforms};
pub use report::{ExecutionReport, ReportEntry, ReportSummary};
pub use scenario::{Scenario, ScenarioKind, ScenarioResult, ScenarioRunner};
pub use sender::{DeliveryError, EventSender, InProcessSender, PlatformEvent};
