//! Chaos-aware delivery.
//!
//! A [`ChaosDecision`] is turned into an [`Effect`] plan over [`Delivery`]
//! actions and run by the runtime's [`EffectExecutor`]. The [`DeliverySink`]
//! performs each send and records it in the run's report.
//!
//! ```text
//! fail          → Effect::None (recorded undelivered by the caller)
//! delay d, dup n → Sequential[Delay(d, original), Dispatch(copy) × n]
//! ```
//!
//! Every copy carries the original's event id.
//!
//! [`EffectExecutor`]: roomsync_runtime::EffectExecutor

use crate::chaos::ChaosDecision;
use crate::metrics;
use crate::report::{DUPLICATE_TAG, ExecutionReport, ReportEntry};
use crate::sender::{EventSender, PlatformEvent};
use roomsync_core::effect::Effect;
use roomsync_runtime::ActionSink;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

/// One send of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// The event being sent
    pub event: Arc<PlatformEvent>,
    /// Report tag for this copy
    pub tag: String,
}

impl Delivery {
    /// Whether this is a duplicate copy
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.tag == DUPLICATE_TAG
    }
}

/// Build the delivery plan for one event.
#[must_use]
pub fn plan(event: &Arc<PlatformEvent>, decision: &ChaosDecision) -> Effect<Delivery> {
    if decision.fail {
        return Effect::None;
    }

    let original = Box::new(Delivery {
        event: Arc::clone(event),
        tag: decision.to_string(),
    });
    let first = match decision.delay() {
        Some(duration) => Effect::Delay {
            duration,
            action: original,
        },
        None => Effect::Dispatch(original),
    };

    let copies = (0..decision.extra_copies()).map(|_| {
        Effect::Dispatch(Box::new(Delivery {
            event: Arc::clone(event),
            tag: DUPLICATE_TAG.to_string(),
        }))
    });

    Effect::chain(std::iter::once(first).chain(copies).collect())
}

/// Sends deliveries and records each attempt.
pub struct DeliverySink {
    sender: Arc<dyn EventSender>,
    report: Mutex<ExecutionReport>,
}

impl DeliverySink {
    /// Sink writing into a fresh report for `correlation_id`
    #[must_use]
    pub fn new(sender: Arc<dyn EventSender>, correlation_id: &str) -> Self {
        Self {
            sender,
            report: Mutex::new(ExecutionReport::new(correlation_id)),
        }
    }

    /// Record an attempt that never reached the sender
    pub fn record_dropped(&self, event: &PlatformEvent, tag: String) {
        metrics::record_delivery(event.source, "dropped");
        self.record(event, tag, false);
    }

    /// Apply `f` to the report
    pub fn with_report<T>(&self, f: impl FnOnce(&mut ExecutionReport) -> T) -> T {
        f(&mut self.report.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Copy of the report so far
    #[must_use]
    pub fn report(&self) -> ExecutionReport {
        self.with_report(|report| report.clone())
    }

    fn record(&self, event: &PlatformEvent, chaos: String, delivered: bool) {
        self.with_report(|report| {
            report.record(ReportEntry {
                source: event.source,
                kind: event.kind,
                event_id: event.event_id.clone(),
                reservation_id: event.reservation_id.clone(),
                chaos,
                delivered,
            });
        });
    }
}

impl ActionSink<Delivery> for DeliverySink {
    fn dispatch(&self, delivery: Delivery) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let event = &delivery.event;
            let delivered = match self.sender.send(event).await {
                Ok(()) => {
                    tracing::debug!(
                        source = %event.source,
                        kind = %event.kind,
                        event_id = %event.event_id,
                        chaos = %delivery.tag,
                        "Delivered"
                    );
                    metrics::record_delivery(event.source, "delivered");
                    true
                },
                Err(e) => {
                    tracing::info!(
                        source = %event.source,
                        kind = %event.kind,
                        event_id = %event.event_id,
                        chaos = %delivery.tag,
                        error = %e,
                        "Delivery not accepted"
                    );
                    metrics::record_delivery(event.source, "refused");
                    false
                },
            };
            self.record(event, delivery.tag, delivered);
        })
    }
}
