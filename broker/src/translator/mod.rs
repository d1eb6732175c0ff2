//! Per-source payload translation.
//!
//! Each upstream source gets one [`Translator`] value: its source tag plus a
//! parse function that decodes the payload into [`SourceFields`]. Everything
//! sources have in common (dedup key, stay validation, timestamp defaults)
//! happens once in [`SourceFields::into_event`].
//!
//! Translators are looked up by source through a [`TranslatorRegistry`]. The
//! registry is a plain map, so a source without a translator is a routing
//! failure the caller reports, not a panic.

use chrono::{DateTime, NaiveDate, Utc};
use roomsync_core::event::{Amount, CanonicalEvent, EventStatus, Guest, InvalidStayRange, StayRange};
use roomsync_core::source::{EventKind, SourceType};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Source `A` payloads
pub mod alpha;

/// Source `B` payloads
pub mod beta;

/// Source `C` payloads
pub mod gamma;

/// Shared date/time parsers
pub mod time;

/// What went wrong inside a translator.
#[derive(Error, Debug)]
pub enum TranslationCause {
    /// Payload is not the JSON shape the source sends
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is missing or blank
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A date did not match the source's format
    #[error("invalid date in `{field}`: {value}")]
    InvalidDate {
        /// Payload key
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// A timestamp did not match the source's format or is out of range
    #[error("invalid timestamp in `{field}`: {value}")]
    InvalidTimestamp {
        /// Payload key
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Check-out is not after check-in
    #[error(transparent)]
    InvalidStay(#[from] InvalidStayRange),
}

/// Translation failure, tagged with the source whose payload failed.
#[derive(Error, Debug)]
#[error("{source_type} payload translation failed: {cause}")]
pub struct TranslationError {
    /// Source whose translator failed
    pub source_type: SourceType,
    /// Underlying cause
    #[source]
    pub cause: TranslationCause,
}

/// Values minted by the router for one delivery.
#[derive(Debug, Clone)]
pub struct TranslationContext<'a> {
    /// Fresh canonical event id
    pub event_id: Uuid,
    /// Effective delivery id
    pub delivery_id: &'a str,
    /// Booking or cancellation, from the delivery header
    pub kind: EventKind,
    /// Receipt time; default for missing source timestamps
    pub received_at: DateTime<Utc>,
}

/// Source-specific fields after decoding, before common validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFields {
    /// Reservation id in the source namespace
    pub reservation_id: Option<String>,
    /// Room (listing) id in the source namespace
    pub room_ref: Option<String>,
    /// Property id in the source namespace
    pub property_ref: Option<String>,
    /// Property display name
    pub property_name: Option<String>,
    /// Property address
    pub property_address: Option<String>,
    /// Check-in date
    pub check_in: Option<NaiveDate>,
    /// Check-out date
    pub check_out: Option<NaiveDate>,
    /// Guest contact details
    pub guest: Guest,
    /// Reported total
    pub total_amount: Amount,
    /// Canonical status after the source's status table
    pub status: EventStatus,
    /// Source timestamp of the change
    pub occurred_at: Option<DateTime<Utc>>,
}

impl SourceFields {
    /// Validate common invariants and build the canonical event.
    ///
    /// Bookings need both stay dates. Cancellations may omit them, but a
    /// cancellation that does carry dates must carry a valid range.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationCause`] for a missing reservation id, a booking
    /// without dates, or an inverted stay.
    pub fn into_event(
        self,
        source: SourceType,
        raw_payload: &str,
        ctx: &TranslationContext<'_>,
    ) -> Result<CanonicalEvent, TranslationCause> {
        let source_reservation_id = time::non_blank_owned(self.reservation_id)
            .ok_or(TranslationCause::MissingField("reservation id"))?;

        let stay = match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => Some(StayRange::new(check_in, check_out)?),
            (None, _) if ctx.kind == EventKind::Booking => {
                return Err(TranslationCause::MissingField("check-in date"));
            },
            (_, None) if ctx.kind == EventKind::Booking => {
                return Err(TranslationCause::MissingField("check-out date"));
            },
            _ => None,
        };

        Ok(CanonicalEvent {
            event_id: ctx.event_id,
            delivery_id: ctx.delivery_id.to_string(),
            source,
            source_reservation_id,
            kind: ctx.kind,
            room_ref: time::non_blank_owned(self.room_ref),
            property_ref: time::non_blank_owned(self.property_ref),
            property_name: time::non_blank_owned(self.property_name),
            property_address: time::non_blank_owned(self.property_address),
            stay,
            guest: self.guest,
            total_amount: self.total_amount,
            status: self.status,
            occurred_at: self.occurred_at.unwrap_or(ctx.received_at),
            received_at: ctx.received_at,
            raw_payload: raw_payload.to_string(),
        })
    }
}

/// Decodes one source's payload into [`SourceFields`].
pub type ParseFn = fn(&str) -> Result<SourceFields, TranslationCause>;

/// A translator for one source.
#[derive(Clone, Copy)]
pub struct Translator {
    source: SourceType,
    parse: ParseFn,
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Translator {
    /// Create a translator from a parse function
    #[must_use]
    pub const fn new(source: SourceType, parse: ParseFn) -> Self {
        Self { source, parse }
    }

    /// The source this translator handles
    #[must_use]
    pub const fn source(&self) -> SourceType {
        self.source
    }

    /// Translate a raw payload into a canonical event.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError`] if the payload cannot be decoded or
    /// violates a canonical invariant.
    pub fn translate(
        &self,
        raw_payload: &str,
        ctx: &TranslationContext<'_>,
    ) -> Result<CanonicalEvent, TranslationError> {
        (self.parse)(raw_payload)
            .and_then(|fields| fields.into_event(self.source, raw_payload, ctx))
            .map_err(|cause| TranslationError {
                source_type: self.source,
                cause,
            })
    }
}

/// Translators keyed by source.
#[derive(Debug, Clone, Default)]
pub struct TranslatorRegistry {
    translators: HashMap<SourceType, Translator>,
}

impl TranslatorRegistry {
    /// Registry with no translators
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with a translator for every known source
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with(alpha::translator())
            .with(beta::translator())
            .with(gamma::translator())
    }

    /// Add or replace a translator
    #[must_use]
    pub fn with(mut self, translator: Translator) -> Self {
        self.translators.insert(translator.source(), translator);
        self
    }

    /// Translator for a source, if registered
    #[must_use]
    pub fn get(&self, source: SourceType) -> Option<&Translator> {
        self.translators.get(&source)
    }

    /// Sources with a registered translator
    #[must_use]
    pub fn sources(&self) -> Vec<SourceType> {
        let mut sources: Vec<_> = self.translators.keys().copied().collect();
        sources.sort();
        sources
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ctx(kind: EventKind) -> TranslationContext<'static> {
        TranslationContext {
            event_id: Uuid::nil(),
            delivery_id: "delivery-1",
            kind,
            received_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    fn fields() -> SourceFields {
        SourceFields {
            reservation_id: Some("R-1".to_string()),
            room_ref: Some("room".to_string()),
            check_in: NaiveDate::from_ymd_opt(2025, 8, 15),
            check_out: NaiveDate::from_ymd_opt(2025, 8, 18),
            ..SourceFields::default()
        }
    }

    #[test]
    fn missing_timestamp_defaults_to_receipt_time() {
        let event = fields()
            .into_event(SourceType::Alpha, "{}", &ctx(EventKind::Booking))
            .unwrap();
        assert_eq!(event.occurred_at, event.received_at);
        assert_eq!(event.stay.unwrap().nights(), 3);
        assert_eq!(event.delivery_id, "delivery-1");
    }

    #[test]
    fn booking_requires_dates() {
        let fields = SourceFields {
            check_out: None,
            ..fields()
        };
        let err = fields
            .into_event(SourceType::Beta, "{}", &ctx(EventKind::Booking))
            .unwrap_err();
        assert!(matches!(err, TranslationCause::MissingField("check-out date")));
    }

    #[test]
    fn cancellation_may_omit_dates() {
        let fields = SourceFields {
            check_in: None,
            check_out: None,
            ..fields()
        };
        let event = fields
            .into_event(SourceType::Gamma, "{}", &ctx(EventKind::Cancellation))
            .unwrap();
        assert_eq!(event.stay, None);
    }

    #[test]
    fn inverted_stay_is_rejected() {
        let fields = SourceFields {
            check_in: NaiveDate::from_ymd_opt(2025, 8, 18),
            check_out: NaiveDate::from_ymd_opt(2025, 8, 15),
            ..fields()
        };
        let err = fields
            .into_event(SourceType::Alpha, "{}", &ctx(EventKind::Cancellation))
            .unwrap_err();
        assert!(matches!(err, TranslationCause::InvalidStay(_)));
    }

    #[test]
    fn blank_reservation_id_is_missing() {
        let fields = SourceFields {
            reservation_id: Some("   ".to_string()),
            ..fields()
        };
        assert!(matches!(
            fields.into_event(SourceType::Alpha, "{}", &ctx(EventKind::Booking)),
            Err(TranslationCause::MissingField("reservation id"))
        ));
    }

    #[test]
    fn errors_are_tagged_with_the_source() {
        let translator = beta::translator();
        let err = translator
            .translate("not json", &ctx(EventKind::Booking))
            .unwrap_err();
        assert_eq!(err.source_type, SourceType::Beta);
        assert!(err.to_string().starts_with("BETA payload translation failed: malformed payload"));
    }

    #[test]
    fn standard_registry_covers_every_source() {
        let registry = TranslatorRegistry::standard();
        assert_eq!(registry.sources(), SourceType::ALL.to_vec());
        assert!(TranslatorRegistry::empty().get(SourceType::Alpha).is_none());
    }
}
