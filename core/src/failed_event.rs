//! Failed-event records and their store contract.
//!
//! Deliveries that cannot be parsed, routed or translated are kept as a
//! [`FailedEvent`] together with the raw payload and the cause. Business
//! rejections (unknown room, dates not available) never land here; they live
//! in the audit trail.
//!
//! Nothing in roomsync retries failed events on its own. An external
//! scheduler drains the store through [`FailedEventStore::list_unresolved`],
//! replays each payload, and records the attempt with
//! [`FailedEvent::increment_retry_count`] or [`FailedEvent::resolve`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Why a delivery could not be ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestionErrorKind {
    /// Body is not valid JSON or lacks the envelope shape
    ParseError,
    /// Source header missing or not a known alias
    InvalidSource,
    /// No translator registered for the source
    TranslatorNotFound,
    /// Envelope payload could not be re-serialized for the translator
    PayloadSerializationFailed,
    /// Source payload did not translate into a canonical event
    TranslationFailed,
    /// Reconciler backend failed while applying the event
    ReconciliationError,
}

impl IngestionErrorKind {
    /// Stable code used in logs, metrics and storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "PARSE_ERROR",
            Self::InvalidSource => "INVALID_SOURCE",
            Self::TranslatorNotFound => "TRANSLATOR_NOT_FOUND",
            Self::PayloadSerializationFailed => "PAYLOAD_SERIALIZATION_FAILED",
            Self::TranslationFailed => "TRANSLATION_FAILED",
            Self::ReconciliationError => "RECONCILIATION_ERROR",
        }
    }

    /// Parse a stored code.
    ///
    /// # Errors
    ///
    /// Returns [`FailedEventStoreError::Corrupt`] for an unknown code.
    pub fn parse(s: &str) -> Result<Self, FailedEventStoreError> {
        match s {
            "PARSE_ERROR" => Ok(Self::ParseError),
            "INVALID_SOURCE" => Ok(Self::InvalidSource),
            "TRANSLATOR_NOT_FOUND" => Ok(Self::TranslatorNotFound),
            "PAYLOAD_SERIALIZATION_FAILED" => Ok(Self::PayloadSerializationFailed),
            "TRANSLATION_FAILED" => Ok(Self::TranslationFailed),
            "RECONCILIATION_ERROR" => Ok(Self::ReconciliationError),
            _ => Err(FailedEventStoreError::Corrupt(format!(
                "Invalid ingestion error kind: {s}"
            ))),
        }
    }
}

impl fmt::Display for IngestionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEvent {
    /// Effective delivery id
    pub event_id: String,
    /// Source header as received
    pub source_header: Option<String>,
    /// Event-kind header as received
    pub event_kind_header: Option<String>,
    /// Correlation id header as received
    pub correlation_id: Option<String>,
    /// Reservation id from the envelope, when it could be read
    pub reservation_id: Option<String>,
    /// Payload (or whole body when the envelope did not parse)
    pub raw_payload: String,
    /// Typed cause
    pub error_kind: IngestionErrorKind,
    /// Human readable cause
    pub error_message: String,
    /// When ingestion failed
    pub failed_at: DateTime<Utc>,
    /// Replay attempts made by the external scheduler
    pub retry_count: u32,
    /// Whether a replay succeeded
    pub resolved: bool,
}

impl FailedEvent {
    /// Records one more replay attempt.
    pub const fn increment_retry_count(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// Marks the event as successfully replayed.
    pub const fn resolve(&mut self) {
        self.resolved = true;
    }
}

/// Errors from the failed-event store backend.
#[derive(Error, Debug, Clone)]
pub enum FailedEventStoreError {
    /// Backend could not be reached.
    #[error("Failed-event store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("Corrupt failed-event record: {0}")]
    Corrupt(String),
}

/// Enqueue/list contract for failed events.
pub trait FailedEventStore: Send + Sync {
    /// Persist a failed event.
    ///
    /// # Errors
    ///
    /// Returns [`FailedEventStoreError`] if the backend fails.
    fn enqueue(
        &self,
        event: FailedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), FailedEventStoreError>> + Send + '_>>;

    /// List failed events not yet resolved, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`FailedEventStoreError`] if the backend fails.
    fn list_unresolved(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FailedEvent>, FailedEventStoreError>> + Send + '_>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_their_own_codes() {
        for kind in [
            IngestionErrorKind::ParseError,
            IngestionErrorKind::InvalidSource,
            IngestionErrorKind::TranslatorNotFound,
            IngestionErrorKind::PayloadSerializationFailed,
            IngestionErrorKind::TranslationFailed,
            IngestionErrorKind::ReconciliationError,
        ] {
            assert_eq!(IngestionErrorKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(IngestionErrorKind::parse("NOPE").is_err());
    }

    #[test]
    fn retry_bookkeeping() {
        let mut event = FailedEvent {
            event_id: "evt-1".to_string(),
            source_header: Some("Z".to_string()),
            event_kind_header: None,
            correlation_id: None,
            reservation_id: None,
            raw_payload: "{}".to_string(),
            error_kind: IngestionErrorKind::InvalidSource,
            error_message: "unknown source: Z".to_string(),
            failed_at: Utc::now(),
            retry_count: 0,
            resolved: false,
        };
        event.increment_retry_count();
        event.increment_retry_count();
        event.resolve();
        assert_eq!(event.retry_count, 2);
        assert!(event.resolved);
    }
}
