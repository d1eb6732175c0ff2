//! Raw delivery storage contract and delivery headers.
//!
//! The raw store is the loss-prevention guarantee: every body is handed to it
//! before any parsing happens. It is append-only and write-only from
//! roomsync's point of view; it exists for forensic replay.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Header carrying the delivery's event id
pub const HEADER_EVENT_ID: &str = "X-Event-Id";
/// Header carrying the source alias
pub const HEADER_SOURCE: &str = "X-Platform";
/// Header carrying the event kind alias
pub const HEADER_EVENT_KIND: &str = "X-Event-Type";
/// Header carrying the correlation id
pub const HEADER_CORRELATION_ID: &str = "X-Correlation-Id";

/// Identifying headers of one delivery.
///
/// Values are kept exactly as received; alias resolution happens in the
/// ingestion router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryHeaders {
    /// Delivery event id
    pub event_id: Option<String>,
    /// Source alias (required for routing)
    pub source: Option<String>,
    /// Event kind alias, defaults to booking
    pub event_kind: Option<String>,
    /// Correlation id
    pub correlation_id: Option<String>,
}

impl DeliveryHeaders {
    /// Headers naming only a source
    #[must_use]
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Set the event id
    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Set the event kind
    #[must_use]
    pub fn with_event_kind(mut self, event_kind: impl Into<String>) -> Self {
        self.event_kind = Some(event_kind.into());
        self
    }

    /// Set the correlation id
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Build headers from name/value pairs, matching names case-insensitively.
    ///
    /// Unknown headers are ignored.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let slot = if name.eq_ignore_ascii_case(HEADER_EVENT_ID) {
                &mut headers.event_id
            } else if name.eq_ignore_ascii_case(HEADER_SOURCE) {
                &mut headers.source
            } else if name.eq_ignore_ascii_case(HEADER_EVENT_KIND) {
                &mut headers.event_kind
            } else if name.eq_ignore_ascii_case(HEADER_CORRELATION_ID) {
                &mut headers.correlation_id
            } else {
                continue;
            };
            *slot = Some(value.to_string());
        }
        headers
    }

    /// Header name/value pairs that are present, in wire order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            (HEADER_EVENT_ID, self.event_id.as_deref()),
            (HEADER_SOURCE, self.source.as_deref()),
            (HEADER_EVENT_KIND, self.event_kind.as_deref()),
            (HEADER_CORRELATION_ID, self.correlation_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// Errors from the raw store backend.
#[derive(Error, Debug, Clone)]
pub enum RawStoreError {
    /// Backend could not be reached.
    #[error("Raw event store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only store for raw delivery bodies.
pub trait RawEventStore: Send + Sync {
    /// Append a raw body together with its headers.
    ///
    /// # Errors
    ///
    /// Returns [`RawStoreError`] if the backend fails.
    fn store<'a>(
        &'a self,
        raw_body: &'a str,
        headers: &'a DeliveryHeaders,
    ) -> Pin<Box<dyn Future<Output = Result<(), RawStoreError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_pairs_match_case_insensitively() {
        let headers = DeliveryHeaders::from_pairs([
            ("x-event-id", "evt-1"),
            ("X-PLATFORM", "B"),
            ("x-event-type", "CANCEL"),
            ("Content-Type", "application/json"),
        ]);

        assert_eq!(headers.event_id.as_deref(), Some("evt-1"));
        assert_eq!(headers.source.as_deref(), Some("B"));
        assert_eq!(headers.event_kind.as_deref(), Some("CANCEL"));
        assert_eq!(headers.correlation_id, None);
        assert_eq!(
            headers.to_pairs(),
            vec![
                (HEADER_EVENT_ID, "evt-1"),
                (HEADER_SOURCE, "B"),
                (HEADER_EVENT_KIND, "CANCEL"),
            ]
        );
    }
}
