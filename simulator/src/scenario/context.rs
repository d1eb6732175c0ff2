//! Per-run emit context.

use crate::chaos::ChaosEngine;
use crate::delivery::{self, Delivery, DeliverySink};
use crate::platform::{AlphaPlatform, BetaPlatform, GammaPlatform, Issued, Platforms};
use crate::report::ExecutionReport;
use crate::sender::{EventSender, PlatformEvent};
use chrono::{DateTime, Utc};
use roomsync_core::environment::IdGenerator;
use roomsync_core::source::EventKind;
use roomsync_runtime::{ActionSink, EffectExecutor};
use std::sync::Arc;

/// Everything a scenario needs for one run.
pub struct ScenarioContext {
    correlation_id: String,
    platforms: Platforms,
    chaos: Arc<ChaosEngine>,
    ids: Arc<dyn IdGenerator>,
    sink: Arc<DeliverySink>,
    executor: EffectExecutor<Delivery>,
}

impl ScenarioContext {
    /// Context for one run under `correlation_id`
    #[must_use]
    pub fn new(
        correlation_id: String,
        platforms: Platforms,
        chaos: Arc<ChaosEngine>,
        sender: Arc<dyn EventSender>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let sink = Arc::new(DeliverySink::new(sender, &correlation_id));
        let executor = EffectExecutor::new(sink.clone() as Arc<dyn ActionSink<Delivery>>);
        Self {
            correlation_id,
            platforms,
            chaos,
            ids,
            sink,
            executor,
        }
    }

    /// Run correlation id
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Source `A` platform
    #[must_use]
    pub fn alpha(&self) -> &AlphaPlatform {
        &self.platforms.alpha
    }

    /// Source `B` platform
    #[must_use]
    pub fn beta(&self) -> &BetaPlatform {
        &self.platforms.beta
    }

    /// Source `C` platform
    #[must_use]
    pub fn gamma(&self) -> &GammaPlatform {
        &self.platforms.gamma
    }

    /// The run's chaos engine
    #[must_use]
    pub fn chaos(&self) -> &ChaosEngine {
        &self.chaos
    }

    /// Emit one issued payload under a fresh event id.
    ///
    /// Chaos may drop, delay or duplicate the delivery; every outcome ends
    /// up in the report.
    pub async fn emit(&self, kind: EventKind, issued: &Issued) {
        let event = Arc::new(PlatformEvent {
            source: issued.source,
            kind,
            event_id: self.ids.next_id().to_string(),
            reservation_id: issued.reservation_id.clone(),
            correlation_id: self.correlation_id.clone(),
            payload: issued.payload.clone(),
        });

        let decision = self.chaos.decide();
        tracing::debug!(
            source = %event.source,
            kind = %kind,
            event_id = %event.event_id,
            reservation_id = %event.reservation_id,
            chaos = %decision,
            "Emitting"
        );

        if decision.fail {
            self.sink.record_dropped(&event, decision.to_string());
            return;
        }
        self.executor.execute(delivery::plan(&event, &decision)).await;
    }

    /// Emit a batch, possibly shuffled by the chaos engine first.
    pub async fn emit_batch(&self, batch: Vec<(EventKind, Issued)>) {
        for (kind, issued) in self.chaos.maybe_reorder(batch) {
            self.emit(kind, &issued).await;
        }
    }

    pub(crate) fn mark_start(&self, at: DateTime<Utc>) {
        self.sink.with_report(|report| report.mark_start(at));
    }

    pub(crate) fn mark_end(&self, at: DateTime<Utc>) {
        self.sink.with_report(|report| report.mark_end(at));
    }

    /// Report so far
    #[must_use]
    pub fn report(&self) -> ExecutionReport {
        self.sink.report()
    }
}
