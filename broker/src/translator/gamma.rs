//! Source `C`: numeric status codes, compact dates, epoch seconds, property metadata.

use super::time::{self, COMPACT_DATE};
use super::{SourceFields, TranslationCause, Translator};
use roomsync_core::event::{Amount, EventStatus, Guest};
use roomsync_core::source::SourceType;
use serde::Deserialize;

/// Wire shape of a source `C` payload. Unlisted keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaPayload {
    /// Order id
    pub order_id: Option<String>,
    /// Property id
    pub accommodation_id: Option<String>,
    /// Property display name
    pub accommodation_name: Option<String>,
    /// Property address
    pub accommodation_address: Option<String>,
    /// Room type id
    pub room_type_id: Option<String>,
    /// `yyyyMMdd`
    pub start_date: Option<String>,
    /// `yyyyMMdd`
    pub end_date: Option<String>,
    /// Guest name
    pub buyer_name: Option<String>,
    /// Guest phone
    pub buyer_tel: Option<String>,
    /// Whole currency units
    pub total_amount: Option<i64>,
    /// Numeric state code
    pub state: Option<i64>,
    /// Epoch seconds
    pub registered_ts: Option<i64>,
}

/// Status table for source `C`. Unknown codes are pending.
#[must_use]
pub const fn map_status(state: Option<i64>) -> EventStatus {
    match state {
        Some(1) => EventStatus::Confirmed,
        Some(2) => EventStatus::Cancelled,
        Some(3) => EventStatus::Completed,
        Some(4) => EventStatus::NoShow,
        _ => EventStatus::Pending,
    }
}

/// Decode a source `C` payload.
///
/// # Errors
///
/// Returns [`TranslationCause`] for malformed JSON, unparseable dates or an
/// out-of-range timestamp.
pub fn parse(raw_payload: &str) -> Result<SourceFields, TranslationCause> {
    let payload: GammaPayload = serde_json::from_str(raw_payload)?;

    Ok(SourceFields {
        check_in: time::parse_date("startDate", payload.start_date.as_deref(), COMPACT_DATE)?,
        check_out: time::parse_date("endDate", payload.end_date.as_deref(), COMPACT_DATE)?,
        occurred_at: time::from_epoch_seconds("registeredTs", payload.registered_ts)?,
        status: map_status(payload.state),
        reservation_id: payload.order_id,
        room_ref: payload.room_type_id,
        property_ref: payload.accommodation_id,
        property_name: payload.accommodation_name,
        property_address: payload.accommodation_address,
        guest: Guest {
            name: time::non_blank_owned(payload.buyer_name),
            phone: time::non_blank_owned(payload.buyer_tel),
            email: None,
        },
        total_amount: Amount::from_minor(payload.total_amount.unwrap_or_default()),
    })
}

/// Translator for source `C`
#[must_use]
pub const fn translator() -> Translator {
    Translator::new(SourceType::Gamma, parse)
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

    fn ctx(kind: EventKind) -> TranslationContext<'static> {
        TranslationContext {
            event_id: Uuid::nil(),
            delivery_id: "evt-c",
            kind,
            received_at: DateTime::from_timestamp(1_760_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn translates_a_booking() {
        let payload = r#"{
            "orderId": "YEO-0A1B2C3D",
            "accommodationId": "ACC-0042",
            "accommodationName": "Harbor Hotel",
            "accommodationAddress": "1 Pier Road",
            "roomTypeId": "RT-R-101",
            "roomTypeName": "Standard",
            "startDate": "20250815",
            "endDate": "20250818",
            "buyerName": "Lee Jisoo",
            "buyerTel": "010-9876-5432",
            "totalAmount": 270000,
            "payMethod": "KAKAO",
            "state": 1,
            "registeredTs": 1754006400
        }"#;

        let event = translator().translate(payload, &ctx(EventKind::Booking)).unwrap();

        assert_eq!(event.source, SourceType::Gamma);
        assert_eq!(event.source_reservation_id, "YEO-0A1B2C3D");
        assert_eq!(event.room_ref.as_deref(), Some("RT-R-101"));
        assert_eq!(event.property_ref.as_deref(), Some("ACC-0042"));
        assert_eq!(event.property_address.as_deref(), Some("1 Pier Road"));
        assert_eq!(
            event.stay.unwrap().check_in(),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
        );
        assert_eq!(event.guest.phone.as_deref(), Some("010-9876-5432"));
        assert_eq!(event.total_amount, Amount::from_minor(270_000));
        assert_eq!(event.status, EventStatus::Confirmed);
        assert_eq!(event.occurred_at.timestamp(), 1_754_006_400);
    }

    #[test]
    fn iso_dates_are_rejected() {
        let payload = r#"{"orderId":"YEO-1","roomTypeId":"RT-1","startDate":"2025-08-15","endDate":"20250818"}"#;
        let err = translator().translate(payload, &ctx(EventKind::Booking)).unwrap_err();
        assert!(err.to_string().starts_with("GAMMA payload translation failed"));
        assert!(err.to_string().contains("startDate"));
    }

    #[test]
    fn inverted_stay_is_rejected() {
        let payload = r#"{"orderId":"YEO-1","roomTypeId":"RT-1","startDate":"20250818","endDate":"20250815"}"#;
        assert!(translator().translate(payload, &ctx(EventKind::Booking)).is_err());
    }

    proptest! {
        #[test]
        fn status_table_is_total(state in any::<i64>()) {
            let expected = match state {
                1 => EventStatus::Confirmed,
                2 => EventStatus::Cancelled,
                3 => EventStatus::Completed,
                4 => EventStatus::NoShow,
                _ => EventStatus::Pending,
            };
            prop_assert_eq!(map_status(Some(state)), expected);
        }
    }
}
