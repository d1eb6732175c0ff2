//! # Roomsync Broker
//!
//! Normalizes reservation deliveries from three upstream sources and keeps one
//! authoritative per-room, per-night inventory.
//!
//! ## Pipeline
//!
//! ```text
//! raw body + headers
//!   → IngestionRouter   (store raw, unwrap envelope, resolve source/kind)
//!   → Translator        (source payload → CanonicalEvent)
//!   → Reconciler        (per-room lock, LedgerReducer, one atomic commit)
//! ```
//!
//! Anything that cannot be routed becomes a failed event with its raw payload.
//! Business rejections (unknown room, dates taken) come back as answers.
//!
//! ## Example
//!
//! ```ignore
//! let reconciler = Arc::new(Reconciler::new(directory, repository, ledger_env));
//! let router = IngestionRouter::new(ingestion_env, TranslatorRegistry::standard(), reconciler);
//!
//! let outcome = router.ingest(&body, &DeliveryHeaders::for_source("A")).await;
//! assert!(outcome.is_accepted());
//! ```

/// Broker assembly
pub mod app;

/// Configuration management
pub mod config;

/// Ingestion router
pub mod ingestion;

/// Business metrics
pub mod metrics;

/// Reservation reconciler and room ledger
pub mod reconciler;

/// Ledger persistence
pub mod store;

/// Per-source payload translators
pub mod translator;

pub use app::Broker;
pub use config::Config;
pub use ingestion::{IngestionEnvironment, IngestionOutcome, IngestionRouter};
pub use reconciler::{
    FailureReason, LedgerEnvironment, ProcessingOutcome, ProcessingResult, ReconcileError,
    Reconciler,
};
pub use store::{InMemoryLedgerRepository, LedgerCommit, LedgerRepository, RepositoryError};
pub use translator::{TranslationError, Translator, TranslatorRegistry};
