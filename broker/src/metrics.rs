//! Business metrics for the broker.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `roomsync_events_ingested_total{source,outcome}` - Deliveries by final outcome
//! - `roomsync_translation_failures_total{source}` - Payloads a translator rejected
//! - `roomsync_reconcile_outcomes_total{kind,outcome}` - Reconciliation outcomes
//!
//! ## Histograms
//! - `roomsync_reconcile_duration_seconds{kind}` - Time spent reconciling one event

use metrics::{counter, describe_counter, describe_histogram, histogram};
use roomsync_core::source::{EventKind, SourceType};
use std::time::Duration;

use crate::reconciler::ProcessingOutcome;

/// Label used when the source header is missing or unknown
pub const UNKNOWN_SOURCE: &str = "UNKNOWN";

/// Register metric descriptions.
///
/// Call once at startup, before anything is recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "roomsync_events_ingested_total",
        "Deliveries handled by the ingestion router, by source and outcome (accepted, rejected, failed)"
    );
    describe_counter!(
        "roomsync_translation_failures_total",
        "Payloads a source translator could not translate"
    );
    describe_counter!(
        "roomsync_reconcile_outcomes_total",
        "Reconciliation outcomes by event kind"
    );
    describe_histogram!(
        "roomsync_reconcile_duration_seconds",
        "Time taken to reconcile one canonical event"
    );

    tracing::info!("Business metrics registered");
}

/// Record the final outcome of one delivery
pub fn record_ingestion(source: Option<SourceType>, outcome: &'static str) {
    counter!(
        "roomsync_events_ingested_total",
        "source" => source.map_or(UNKNOWN_SOURCE, SourceType::as_str),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a translator failure
pub fn record_translation_failure(source: SourceType) {
    counter!("roomsync_translation_failures_total", "source" => source.as_str()).increment(1);
}

/// Record one reconciliation
pub fn record_reconcile(kind: EventKind, outcome: ProcessingOutcome, elapsed: Duration) {
    counter!(
        "roomsync_reconcile_outcomes_total",
        "kind" => kind.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("roomsync_reconcile_duration_seconds", "kind" => kind.as_str())
        .record(elapsed.as_secs_f64());
}
