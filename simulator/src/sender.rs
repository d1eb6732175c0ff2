//! Outbound delivery of platform events.
//!
//! An event goes out as the broker's wire envelope
//! `{eventId, reservationId, payload}` with the `X-Event-Id`, `X-Platform`,
//! `X-Event-Type` and `X-Correlation-Id` headers. The platform header carries
//! the short source code.

use roomsync_broker::{FailureReason, IngestionOutcome, IngestionRouter};
use roomsync_core::failed_event::IngestionErrorKind;
use roomsync_core::raw_event::DeliveryHeaders;
use roomsync_core::source::{EventKind, SourceType};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// One emitted platform event, ready to deliver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEvent {
    /// Emitting platform
    pub source: SourceType,
    /// Lifecycle step
    pub kind: EventKind,
    /// Delivery id; every copy of a delivery shares it
    pub event_id: String,
    /// The platform's reservation id
    pub reservation_id: String,
    /// Scenario run the event belongs to
    pub correlation_id: String,
    /// Native payload
    pub payload: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    event_id: &'a str,
    reservation_id: &'a str,
    payload: &'a serde_json::Value,
}

impl PlatformEvent {
    /// Delivery headers
    #[must_use]
    pub fn headers(&self) -> DeliveryHeaders {
        DeliveryHeaders::for_source(self.source.code())
            .with_event_id(&self.event_id)
            .with_event_kind(self.kind.as_str())
            .with_correlation_id(&self.correlation_id)
    }

    /// Wire body.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Encode`] if the envelope does not serialize.
    pub fn body(&self) -> Result<String, DeliveryError> {
        Ok(serde_json::to_string(&Envelope {
            event_id: &self.event_id,
            reservation_id: &self.reservation_id,
            payload: &self.payload,
        })?)
    }
}

/// Why a delivery did not land.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The broker answered with a business rejection
    #[error("delivery {event_id} rejected: {reason}")]
    Rejected {
        /// Delivery id
        event_id: String,
        /// Rejection code
        reason: FailureReason,
    },
    /// The broker could not ingest the delivery
    #[error("delivery {event_id} failed with {kind}: {message}")]
    Failed {
        /// Delivery id
        event_id: String,
        /// Failure code
        kind: IngestionErrorKind,
        /// Failure detail
        message: String,
    },
    /// The envelope could not be built
    #[error("envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Delivers platform events to a broker.
///
/// # Dyn Compatibility
///
/// Returns `Pin<Box<dyn Future>>` so senders can be held as
/// `Arc<dyn EventSender>`.
pub trait EventSender: Send + Sync {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the broker does not accept the event.
    fn send<'a>(
        &'a self,
        event: &'a PlatformEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;
}

/// Sender that hands events straight to an in-process ingestion router.
pub struct InProcessSender {
    router: Arc<IngestionRouter>,
}

impl InProcessSender {
    /// Sender feeding `router`
    #[must_use]
    pub const fn new(router: Arc<IngestionRouter>) -> Self {
        Self { router }
    }
}

impl EventSender for InProcessSender {
    fn send<'a>(
        &'a self,
        event: &'a PlatformEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>> {
        Box::pin(async move {
            let body = event.body()?;
            match self.router.ingest(&body, &event.headers()).await {
                IngestionOutcome::Accepted { .. } => Ok(()),
                IngestionOutcome::Rejected { event_id, reason } => {
                    Err(DeliveryError::Rejected { event_id, reason })
                },
                IngestionOutcome::Failed {
                    event_id,
                    kind,
                    message,
                } => Err(DeliveryError::Failed {
                    event_id,
                    kind,
                    message,
                }),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> PlatformEvent {
        PlatformEvent {
            source: SourceType::Beta,
            kind: EventKind::Cancellation,
            event_id: "evt-1".to_string(),
            reservation_id: "HMABCDEFGH".to_string(),
            correlation_id: "run-1".to_string(),
            payload: json!({ "confirmationCode": "HMABCDEFGH", "status": "CANCELLED" }),
        }
    }

    #[test]
    fn headers_carry_short_code_and_kind() {
        assert_eq!(
            event().headers().to_pairs(),
            vec![
                ("X-Event-Id", "evt-1"),
                ("X-Platform", "B"),
                ("X-Event-Type", "CANCELLATION"),
                ("X-Correlation-Id", "run-1"),
            ]
        );
    }

    #[test]
    fn body_is_the_broker_envelope() {
        let body: serde_json::Value = serde_json::from_str(&event().body().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "eventId": "evt-1",
                "reservationId": "HMABCDEFGH",
                "payload": { "confirmationCode": "HMABCDEFGH", "status": "CANCELLED" }
            })
        );
    }
}
