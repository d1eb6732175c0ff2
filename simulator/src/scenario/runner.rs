//! Scenario runner.

use super::{Scenario, ScenarioContext, ScenarioResult};
use crate::chaos::ChaosEngine;
use crate::platform::Platforms;
use crate::sender::EventSender;
use roomsync_core::environment::{Clock, IdGenerator};
use std::sync::Arc;
use tracing::Instrument;

/// Runs scenarios against one sender with shared platforms and chaos.
pub struct ScenarioRunner {
    platforms: Platforms,
    sender: Arc<dyn EventSender>,
    chaos: Arc<ChaosEngine>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(
        sender: Arc<dyn EventSender>,
        chaos: Arc<ChaosEngine>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            platforms: Platforms::new(Arc::clone(&clock)),
            sender,
            chaos,
            clock,
            ids,
        }
    }

    /// The platforms scenarios book on
    #[must_use]
    pub const fn platforms(&self) -> &Platforms {
        &self.platforms
    }

    /// Run one scenario under a fresh correlation id.
    ///
    /// Never fails; an aborted scenario comes back with `success == false`
    /// and whatever it managed to send.
    pub async fn run(&self, scenario: &dyn Scenario) -> ScenarioResult {
        let correlation_id = self.ids.next_id().to_string();
        let span = tracing::info_span!(
            "scenario",
            name = scenario.name(),
            correlation_id = %correlation_id
        );

        let ctx = ScenarioContext::new(
            correlation_id,
            self.platforms.clone(),
            Arc::clone(&self.chaos),
            Arc::clone(&self.sender),
            Arc::clone(&self.ids),
        );

        ctx.mark_start(self.clock.now());
        let outcome = scenario.execute(&ctx).instrument(span.clone()).await;
        ctx.mark_end(self.clock.now());

        let report = ctx.report();
        let summary = report.summary();
        let error = outcome.err().map(|e| e.to_string());
        span.in_scope(|| match &error {
            None => tracing::info!(
                total = summary.total,
                delivered = summary.delivered,
                failed = summary.failed,
                chaotic = summary.chaotic,
                duration_ms = report.duration_ms(),
                "Scenario completed"
            ),
            Some(error) => tracing::warn!(error = %error, "Scenario aborted"),
        });

        ScenarioResult {
            scenario: scenario.name(),
            success: error.is_none(),
            report,
            error,
        }
    }
}
