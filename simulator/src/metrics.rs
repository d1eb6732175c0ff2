//! Simulator metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `roomsync_chaos_decisions_total{effect}` - Chaos effects applied (clean, duplicate, delay, fail, reorder)
//! - `roomsync_deliveries_total{source,result}` - Sends by result (delivered, refused, dropped)

use metrics::{counter, describe_counter};
use roomsync_core::source::SourceType;

/// Register metric descriptions.
pub fn register_simulator_metrics() {
    describe_counter!(
        "roomsync_chaos_decisions_total",
        "Chaos effects applied to deliveries and batches"
    );
    describe_counter!(
        "roomsync_deliveries_total",
        "Simulated deliveries by source and result"
    );
}

/// Record one applied chaos effect
pub fn record_chaos_effect(effect: &'static str) {
    counter!("roomsync_chaos_decisions_total", "effect" => effect).increment(1);
}

/// Record one send attempt
pub fn record_delivery(source: SourceType, result: &'static str) {
    counter!(
        "roomsync_deliveries_total",
        "source" => source.as_str(),
        "result" => result
    )
    .increment(1);
}
