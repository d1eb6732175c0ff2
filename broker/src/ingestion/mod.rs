//! Ingestion router: the single entry point for upstream deliveries.
//!
//! A delivery is a raw JSON body plus [`DeliveryHeaders`]. The router stores
//! the body verbatim, unwraps the envelope, resolves the source and kind from
//! the headers, translates the payload and hands the canonical event to the
//! [`Reconciler`].
//!
//! Every failure before reconciliation becomes a [`FailedEvent`] carrying the
//! raw payload, so nothing that reached the broker is lost. Business
//! rejections from the reconciler are answers, not failures, and are never
//! written to the failed-event store.
//!
//! [`ingest`](IngestionRouter::ingest) never returns an error and never panics.

use crate::metrics;
use crate::reconciler::{FailureReason, ProcessingResult, Reconciler};
use crate::translator::{TranslationContext, TranslatorRegistry};
use roomsync_core::environment::{Clock, IdGenerator};
use roomsync_core::failed_event::{FailedEvent, FailedEventStore, IngestionErrorKind};
use roomsync_core::raw_event::{DeliveryHeaders, RawEventStore};
use roomsync_core::source::{EventKind, SourceType};
use serde::Deserialize;
use std::sync::Arc;

/// Outer shape of every delivery body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    event_id: Option<String>,
    reservation_id: Option<String>,
    payload: serde_json::Value,
}

/// Final answer for one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionOutcome {
    /// Translated and reconciled (including harmless no-ops)
    Accepted {
        /// Effective delivery id
        event_id: String,
        /// Reconciliation result
        result: ProcessingResult,
    },
    /// Translated, but the reconciler refused it
    Rejected {
        /// Effective delivery id
        event_id: String,
        /// Why
        reason: FailureReason,
    },
    /// Could not be routed; a failed event was recorded
    Failed {
        /// Effective delivery id
        event_id: String,
        /// Error class
        kind: IngestionErrorKind,
        /// Human-readable cause
        message: String,
    },
}

impl IngestionOutcome {
    /// Effective delivery id
    #[must_use]
    pub fn event_id(&self) -> &str {
        match self {
            Self::Accepted { event_id, .. }
            | Self::Rejected { event_id, .. }
            | Self::Failed { event_id, .. } => event_id,
        }
    }

    /// Whether the delivery was accepted
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Failed { .. } => "failed",
        }
    }
}

/// A routing failure, before it is recorded.
struct Failure {
    kind: IngestionErrorKind,
    message: String,
    reservation_id: Option<String>,
}

impl Failure {
    fn new(kind: IngestionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            reservation_id: None,
        }
    }

    fn for_reservation(mut self, reservation_id: Option<String>) -> Self {
        self.reservation_id = reservation_id;
        self
    }
}

/// Collaborators of the router.
#[derive(Clone)]
pub struct IngestionEnvironment {
    /// Raw body store
    pub raw_store: Arc<dyn RawEventStore>,
    /// Failed-event store
    pub failed_events: Arc<dyn FailedEventStore>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Event id source
    pub ids: Arc<dyn IdGenerator>,
}

impl IngestionEnvironment {
    /// Creates a new `IngestionEnvironment`
    #[must_use]
    pub fn new(
        raw_store: Arc<dyn RawEventStore>,
        failed_events: Arc<dyn FailedEventStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            raw_store,
            failed_events,
            clock,
            ids,
        }
    }
}

/// Routes deliveries to translators and the reconciler.
pub struct IngestionRouter {
    env: IngestionEnvironment,
    translators: TranslatorRegistry,
    reconciler: Arc<Reconciler>,
}

impl IngestionRouter {
    /// Creates a new `IngestionRouter`
    #[must_use]
    pub fn new(
        env: IngestionEnvironment,
        translators: TranslatorRegistry,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            env,
            translators,
            reconciler,
        }
    }

    /// The reconciler deliveries are routed to
    #[must_use]
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Handle one delivery.
    #[tracing::instrument(
        skip_all,
        fields(
            source = headers.source.as_deref().unwrap_or_default(),
            correlation_id = headers.correlation_id.as_deref().unwrap_or_default(),
            event_id = tracing::field::Empty,
        )
    )]
    pub async fn ingest(&self, raw_body: &str, headers: &DeliveryHeaders) -> IngestionOutcome {
        if let Err(e) = self.env.raw_store.store(raw_body, headers).await {
            tracing::error!(error = %e, "Failed to store raw delivery; continuing");
        }

        let source = headers.source.as_deref().and_then(SourceType::from_alias);

        let envelope: Envelope = match serde_json::from_str(raw_body) {
            Ok(envelope) => envelope,
            Err(e) => {
                let event_id = self.effective_event_id(headers, None);
                let failure = Failure::new(
                    IngestionErrorKind::ParseError,
                    format!("JSON parse failed: {e}"),
                );
                return self.fail(event_id, source, headers, raw_body, failure).await;
            },
        };

        let event_id = self.effective_event_id(headers, envelope.event_id.as_deref());
        tracing::Span::current().record("event_id", event_id.as_str());

        match self.route(&event_id, source, headers, envelope).await {
            Ok(result) => {
                let outcome = match result.failure_reason {
                    Some(reason) => IngestionOutcome::Rejected { event_id, reason },
                    None => IngestionOutcome::Accepted { event_id, result },
                };
                metrics::record_ingestion(source, outcome.as_str());
                outcome
            },
            Err(failure) => self.fail(event_id, source, headers, raw_body, failure).await,
        }
    }

    async fn route(
        &self,
        event_id: &str,
        source: Option<SourceType>,
        headers: &DeliveryHeaders,
        envelope: Envelope,
    ) -> Result<ProcessingResult, Failure> {
        let reservation_id = envelope.reservation_id;

        let Some(source) = source else {
            let message = match headers.source.as_deref() {
                Some(raw) => format!("Unknown source: {raw}"),
                None => "Missing source header".to_string(),
            };
            return Err(Failure::new(IngestionErrorKind::InvalidSource, message)
                .for_reservation(reservation_id));
        };
        let kind = EventKind::from_alias(headers.event_kind.as_deref());

        let Some(translator) = self.translators.get(source) else {
            return Err(Failure::new(
                IngestionErrorKind::TranslatorNotFound,
                format!("No translator registered for {source}"),
            )
            .for_reservation(reservation_id));
        };

        let payload = serde_json::to_string(&envelope.payload).map_err(|e| {
            Failure::new(
                IngestionErrorKind::PayloadSerializationFailed,
                format!("Payload serialization failed: {e}"),
            )
            .for_reservation(reservation_id.clone())
        })?;

        let ctx = TranslationContext {
            event_id: self.env.ids.next_id(),
            delivery_id: event_id,
            kind,
            received_at: self.env.clock.now(),
        };
        let event = translator.translate(&payload, &ctx).map_err(|e| {
            metrics::record_translation_failure(source);
            Failure::new(IngestionErrorKind::TranslationFailed, e.to_string())
                .for_reservation(reservation_id.clone())
        })?;

        tracing::debug!(
            reservation = %event.source_reservation_id,
            kind = %event.kind,
            "Delivery translated"
        );

        self.reconciler.process(event).await.map_err(|e| {
            Failure::new(IngestionErrorKind::ReconciliationError, e.to_string())
                .for_reservation(reservation_id)
        })
    }

    /// Header id, else body id, else a fresh one. Blank counts as absent.
    fn effective_event_id(&self, headers: &DeliveryHeaders, body_event_id: Option<&str>) -> String {
        [headers.event_id.as_deref(), body_event_id]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|id| !id.is_empty())
            .map_or_else(|| self.env.ids.next_id().to_string(), ToOwned::to_owned)
    }

    async fn fail(
        &self,
        event_id: String,
        source: Option<SourceType>,
        headers: &DeliveryHeaders,
        raw_body: &str,
        failure: Failure,
    ) -> IngestionOutcome {
        tracing::warn!(
            kind = failure.kind.as_str(),
            message = %failure.message,
            "Delivery failed; recording failed event"
        );

        let failed = FailedEvent {
            event_id: event_id.clone(),
            source_header: headers.source.clone(),
            event_kind_header: headers.event_kind.clone(),
            correlation_id: headers.correlation_id.clone(),
            reservation_id: failure.reservation_id,
            raw_payload: raw_body.to_string(),
            error_kind: failure.kind,
            error_message: failure.message.clone(),
            failed_at: self.env.clock.now(),
            retry_count: 0,
            resolved: false,
        };
        if let Err(e) = self.env.failed_events.enqueue(failed).await {
            tracing::error!(error = %e, event_id = %event_id, "Failed to record failed event");
        }

        metrics::record_ingestion(source, "failed");
        IngestionOutcome::Failed {
            event_id,
            kind: failure.kind,
            message: failure.message,
        }
    }
}
