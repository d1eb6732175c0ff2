//! Source `B`: English status enums, split guest names, decimal payouts, epoch millis.

use super::time::{self, ISO_DATE};
use super::{SourceFields, TranslationCause, Translator};
use roomsync_core::event::{Amount, EventStatus, Guest};
use roomsync_core::source::SourceType;
use serde::Deserialize;

/// Wire shape of a source `B` payload. Unlisted keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaPayload {
    /// Reservation confirmation code
    pub confirmation_code: Option<String>,
    /// Listing id
    pub listing_id: Option<String>,
    /// `yyyy-MM-dd`
    pub check_in: Option<String>,
    /// `yyyy-MM-dd`
    pub check_out: Option<String>,
    /// Guest given name
    pub guest_first_name: Option<String>,
    /// Guest family name
    pub guest_last_name: Option<String>,
    /// Guest email
    pub guest_email: Option<String>,
    /// Decimal payout
    pub total_payout: Option<f64>,
    /// Reservation status
    pub status: Option<String>,
    /// Epoch milliseconds
    pub created_at: Option<i64>,
}

/// Status table for source `B`. Unknown values are pending.
#[must_use]
pub fn map_status(status: Option<&str>) -> EventStatus {
    match status.map(str::trim) {
        Some("ACCEPTED") => EventStatus::Confirmed,
        Some("CANCELLED" | "DENIED") => EventStatus::Cancelled,
        _ => EventStatus::Pending,
    }
}

/// Join name parts with a space, skipping blanks
fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first, last].into_iter().filter_map(time::non_blank).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Decode a source `B` payload.
///
/// # Errors
///
/// Returns [`TranslationCause`] for malformed JSON, unparseable dates or an
/// out-of-range timestamp.
pub fn parse(raw_payload: &str) -> Result<SourceFields, TranslationCause> {
    let payload: BetaPayload = serde_json::from_str(raw_payload)?;

    Ok(SourceFields {
        check_in: time::parse_date("checkIn", payload.check_in.as_deref(), ISO_DATE)?,
        check_out: time::parse_date("checkOut", payload.check_out.as_deref(), ISO_DATE)?,
        occurred_at: time::from_epoch_millis("createdAt", payload.created_at)?,
        status: map_status(payload.status.as_deref()),
        guest: Guest {
            name: full_name(
                payload.guest_first_name.as_deref(),
                payload.guest_last_name.as_deref(),
            ),
            phone: None,
            email: time::non_blank_owned(payload.guest_email),
        },
        reservation_id: payload.confirmation_code,
        room_ref: payload.listing_id,
        property_ref: None,
        property_name: None,
        property_address: None,
        total_amount: payload.total_payout.map(Amount::from_decimal).unwrap_or_default(),
    })
}

/// Translator for source `B`
#[must_use]
pub const fn translator() -> Translator {
    Translator::new(SourceType::Beta, parse)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::translator::TranslationContext;
    use chrono::DateTime;
    use proptest::prelude::*;
    use roomsync_core::source::EventKind;
    use uuid::Uuid;

    fn ctx(kind: EventKind) -> TranslationContext<'static> {
        TranslationContext {
            event_id: Uuid::nil(),
            delivery_id: "evt-b",
            kind,
            received_at: DateTime::from_timestamp(1_760_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn translates_a_booking() {
        let payload = r#"{
            "confirmationCode": "HMABCDEFGH",
            "listingId": "LST-R-101",
            "hostId": "HOST-1",
            "checkIn": "2025-08-15",
            "checkOut": "2025-08-18",
            "nights": 3,
            "guestFirstName": "Jane",
            "guestLastName": "Doe",
            "guestEmail": "jane@example.com",
            "numberOfGuests": 2,
            "totalPayout": 412.5,
            "currency": "USD",
            "status": "ACCEPTED",
            "createdAt": 1754006400000
        }"#;

        let event = translator().translate(payload, &ctx(EventKind::Booking)).unwrap();

        assert_eq!(event.source, SourceType::Beta);
        assert_eq!(event.source_reservation_id, "HMABCDEFGH");
        assert_eq!(event.room_ref.as_deref(), Some("LST-R-101"));
        assert_eq!(event.guest.name.as_deref(), Some("Jane Doe"));
        assert_eq!(event.guest.email.as_deref(), Some("jane@example.com"));
        assert_eq!(event.total_amount, Amount::from_minor(41_250));
        assert_eq!(event.status, EventStatus::Confirmed);
        assert_eq!(event.occurred_at.timestamp_millis(), 1_754_006_400_000);
        assert_eq!(event.stay.unwrap().nights(), 3);
    }

    #[test]
    fn single_name_part_is_kept_without_padding() {
        assert_eq!(full_name(Some(" Jane "), None).as_deref(), Some("Jane"));
        assert_eq!(full_name(None, Some("Doe")).as_deref(), Some("Doe"));
        assert_eq!(full_name(Some(""), Some("  ")), None);
    }

    #[test]
    fn cancellation_without_dates_translates() {
        let payload = r#"{"confirmationCode":"HMABCDEFGH","listingId":"LST-R-101","status":"CANCELLED"}"#;
        let event = translator()
            .translate(payload, &ctx(EventKind::Cancellation))
            .unwrap();
        assert_eq!(event.stay, None);
        assert_eq!(event.status, EventStatus::Cancelled);
    }

    #[test]
    fn status_table() {
        assert_eq!(map_status(Some("ACCEPTED")), EventStatus::Confirmed);
        assert_eq!(map_status(Some("PENDING")), EventStatus::Pending);
        assert_eq!(map_status(Some("CANCELLED")), EventStatus::Cancelled);
        assert_eq!(map_status(Some("DENIED")), EventStatus::Cancelled);
        assert_eq!(map_status(Some("accepted")), EventStatus::Pending);
        assert_eq!(map_status(None), EventStatus::Pending);
    }

    proptest! {
        #[test]
        fn status_table_is_total(status in "[A-Za-z_]{0,12}") {
            let mapped = map_status(Some(&status));
            match status.as_str() {
                "ACCEPTED" => prop_assert_eq!(mapped, EventStatus::Confirmed),
                "CANCELLED" | "DENIED" => prop_assert_eq!(mapped, EventStatus::Cancelled),
                _ => prop_assert_eq!(mapped, EventStatus::Pending),
            }
        }
    }
}
