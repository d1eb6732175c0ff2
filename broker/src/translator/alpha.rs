//! Source `A`: local-script statuses, ISO dates, and wall-clock timestamps at +09:00.

use super::time::{self, ISO_DATE, KST_OFFSET_SECS};
use super::{SourceFields, TranslationCause, Translator};
use roomsync_core::event::{Amount, EventStatus, Guest};
use roomsync_core::source::SourceType;
use serde::Deserialize;

/// Wire shape of a source `A` payload. Unlisted keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlphaPayload {
    /// Reservation id
    pub reservation_id: Option<String>,
    /// Room id
    pub room_id: Option<String>,
    /// Room display name
    pub room_name: Option<String>,
    /// Property display name
    pub accommodation_name: Option<String>,
    /// `yyyy-MM-dd`
    pub check_in_date: Option<String>,
    /// `yyyy-MM-dd`
    pub check_out_date: Option<String>,
    /// Guest name
    pub guest_name: Option<String>,
    /// Guest phone
    pub guest_phone: Option<String>,
    /// Whole currency units
    pub total_price: Option<i64>,
    /// Local-script status
    pub status: Option<String>,
    /// `yyyy-MM-ddTHH:mm:ss` at +09:00
    pub booked_at: Option<String>,
}

/// Status table for source `A`. Unknown values are pending.
#[must_use]
pub fn map_status(status: Option<&str>) -> EventStatus {
    match status.map(str::trim) {
        Some("예약완료") => EventStatus::Confirmed,
        Some("취소") => EventStatus::Cancelled,
        Some("노쇼") => EventStatus::NoShow,
        _ => EventStatus::Pending,
    }
}

/// Decode a source `A` payload.
///
/// # Errors
///
/// Returns [`TranslationCause`] for malformed JSON or unparseable dates.
pub fn parse(raw_payload: &str) -> Result<SourceFields, TranslationCause> {
    let payload: AlphaPayload = serde_json::from_str(raw_payload)?;

    Ok(SourceFields {
        check_in: time::parse_date("checkInDate", payload.check_in_date.as_deref(), ISO_DATE)?,
        check_out: time::parse_date("checkOutDate", payload.check_out_date.as_deref(), ISO_DATE)?,
        occurred_at: time::parse_local_date_time(
            "bookedAt",
            payload.booked_at.as_deref(),
            KST_OFFSET_SECS,
        )?,
        status: map_status(payload.status.as_deref()),
        reservation_id: payload.reservation_id,
        room_ref: payload.room_id,
        property_ref: None,
        property_name: payload.accommodation_name,
        property_address: None,
        guest: Guest {
            name: time::non_blank_owned(payload.guest_name),
            phone: time::non_blank_owned(payload.guest_phone),
            email: None,
        },
        total_amount: Amount::from_minor(payload.total_price.unwrap_or_default()),
    })
}

/// Translator for source `A`
#[must_use]
pub const fn translator() -> Translator {
    Translator::new(SourceType::Alpha, parse)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::translator::TranslationContext;
    use chrono::{DateTime, NaiveDate};
    use proptest::prelude::*;
    use roomsync_core::source::EventKind;
    use uuid::Uuid;

    const BOOKING: &str = r#"{
        "reservationId": "YNJ-1A2B3C4D",
        "roomId": "R-101",
        "roomName": "Deluxe Double",
        "accommodationName": "Seaside Inn",
        "checkInDate": "2025-08-15",
        "checkOutDate": "2025-08-18",
        "guestName": "Kim Minji",
        "guestPhone": "010-1234-5678",
        "totalPrice": 360000,
        "paymentMethod": "CARD",
        "status": "예약완료",
        "bookedAt": "2025-08-01T10:00:00"
    }"#;

    fn ctx(kind: EventKind) -> TranslationContext<'static> {
        TranslationContext {
            event_id: Uuid::nil(),
            delivery_id: "evt-a",
            kind,
            received_at: DateTime::from_timestamp(1_760_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn translates_a_booking() {
        let event = translator().translate(BOOKING, &ctx(EventKind::Booking)).unwrap();

        assert_eq!(event.source, SourceType::Alpha);
        assert_eq!(event.source_reservation_id, "YNJ-1A2B3C4D");
        assert_eq!(event.room_ref.as_deref(), Some("R-101"));
        assert_eq!(event.property_name.as_deref(), Some("Seaside Inn"));
        let stay = event.stay.unwrap();
        assert_eq!(stay.check_in(), NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
        assert_eq!(stay.check_out(), NaiveDate::from_ymd_opt(2025, 8, 18).unwrap());
        assert_eq!(event.guest.name.as_deref(), Some("Kim Minji"));
        assert_eq!(event.guest.phone.as_deref(), Some("010-1234-5678"));
        assert_eq!(event.total_amount, Amount::from_minor(360_000));
        assert_eq!(event.status, EventStatus::Confirmed);
        assert_eq!(event.occurred_at.to_rfc3339(), "2025-08-01T01:00:00+00:00");
        assert_eq!(event.raw_payload, BOOKING);
    }

    #[test]
    fn missing_booked_at_uses_receipt_time() {
        let payload = r#"{"reservationId":"YNJ-1","roomId":"R-1","checkInDate":"2025-08-15","checkOutDate":"2025-08-16"}"#;
        let context = ctx(EventKind::Booking);
        let event = translator().translate(payload, &context).unwrap();
        assert_eq!(event.occurred_at, context.received_at);
        assert_eq!(event.status, EventStatus::Pending);
    }

    #[test]
    fn wrong_date_format_fails() {
        let payload = r#"{"reservationId":"YNJ-1","roomId":"R-1","checkInDate":"20250815","checkOutDate":"2025-08-16"}"#;
        let err = translator().translate(payload, &ctx(EventKind::Booking)).unwrap_err();
        assert!(err.to_string().contains("checkInDate"));
    }

    #[test]
    fn status_table() {
        assert_eq!(map_status(Some("예약완료")), EventStatus::Confirmed);
        assert_eq!(map_status(Some("취소")), EventStatus::Cancelled);
        assert_eq!(map_status(Some("노쇼")), EventStatus::NoShow);
        assert_eq!(map_status(Some("CONFIRMED")), EventStatus::Pending);
        assert_eq!(map_status(None), EventStatus::Pending);
    }

    proptest! {
        #[test]
        fn status_table_is_total(status in ".*") {
            let mapped = map_status(Some(&status));
            if !["예약완료", "취소", "노쇼"].contains(&status.trim()) {
                prop_assert_eq!(mapped, EventStatus::Pending);
            }
        }
    }
}
