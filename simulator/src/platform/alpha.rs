//! Source `A`: a domestic platform with coupon discounts and local-time stamps.

use super::{Issued, PlatformError, PlatformSimulator, ReservationBook, prefixed_id};
use chrono::Duration;
use rand::Rng;
use rand::seq::SliceRandom;
use roomsync_broker::translator::time::{ISO_DATE, KST_OFFSET_SECS, LOCAL_DATE_TIME};
use roomsync_core::environment::Clock;
use roomsync_core::event::StayRange;
use roomsync_core::source::SourceType;
use serde::Serialize;
use std::sync::Arc;

const STATUS_BOOKED: &str = "예약완료";
const STATUS_CANCELLED: &str = "취소";

const ROOM_NAMES: [&str; 4] = ["디럭스 더블", "스탠다드 트윈", "오션뷰 스위트", "패밀리룸"];
const ACCOMMODATIONS: [&str; 3] = ["바다정원 호텔", "한옥스테이 서촌", "시티 레지던스"];
const PAYMENT_METHODS: [&str; 3] = ["CARD", "KAKAO_PAY", "NAVER_PAY"];
const COUPONS: [(&str, i64); 3] = [("WELCOME10", 10_000), ("SUMMER5", 5_000), ("VIP20", 20_000)];

/// Room id the platform lists `room_code` under
#[must_use]
pub fn listing_id(room_code: &str) -> String {
    room_code.to_string()
}

/// Native reservation payload.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlphaReservation {
    /// `YNJ-` id
    pub reservation_id: String,
    /// Listing id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// Room display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    /// Property display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accommodation_name: Option<String>,
    /// `yyyy-MM-dd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_date: Option<String>,
    /// `yyyy-MM-dd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<String>,
    /// Guest name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    /// `010-XXXX-XXXX`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_phone: Option<String>,
    /// Whole currency units after discount
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<i64>,
    /// Coupon discount
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<i64>,
    /// Applied coupon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// Payment method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Local-script status
    pub status: String,
    /// `yyyy-MM-ddTHH:mm:ss` at +09:00
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_at: Option<String>,
}

/// Source `A` simulator.
pub struct AlphaPlatform {
    clock: Arc<dyn Clock>,
    book: ReservationBook<AlphaReservation>,
}

impl AlphaPlatform {
    /// Create an empty platform
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            book: ReservationBook::default(),
        }
    }

    fn local_now(&self) -> String {
        (self.clock.now().naive_utc() + Duration::seconds(i64::from(KST_OFFSET_SECS)))
            .format(LOCAL_DATE_TIME)
            .to_string()
    }
}

impl PlatformSimulator for AlphaPlatform {
    fn source(&self) -> SourceType {
        SourceType::Alpha
    }

    fn book(&self, room: &str, guest: &str, stay: StayRange) -> Result<Issued, PlatformError> {
        let mut rng = rand::thread_rng();

        let nightly = 50_000 + rng.gen_range(0..150_000_i64);
        let coupon = if rng.gen_bool(0.5) {
            COUPONS.choose(&mut rng).copied()
        } else {
            None
        };
        let discount = coupon.map_or(0, |(_, amount)| amount);

        let reservation = AlphaReservation {
            reservation_id: prefixed_id("YNJ-"),
            room_id: Some(listing_id(room)),
            room_name: ROOM_NAMES.choose(&mut rng).map(ToString::to_string),
            accommodation_name: ACCOMMODATIONS.choose(&mut rng).map(ToString::to_string),
            check_in_date: Some(stay.check_in().format(ISO_DATE).to_string()),
            check_out_date: Some(stay.check_out().format(ISO_DATE).to_string()),
            guest_name: Some(guest.to_string()),
            guest_phone: Some(format!(
                "010-{:04}-{:04}",
                rng.gen_range(0..10_000),
                rng.gen_range(0..10_000)
            )),
            total_price: Some((stay.nights() * nightly - discount).max(0)),
            discount_amount: Some(discount),
            coupon_code: coupon.map(|(code, _)| code.to_string()),
            payment_method: PAYMENT_METHODS.choose(&mut rng).map(ToString::to_string),
            status: STATUS_BOOKED.to_string(),
            booked_at: Some(self.local_now()),
        };

        let issued = Issued::encode(SourceType::Alpha, &reservation.reservation_id, &reservation)?;
        self.book.store(reservation.reservation_id.clone(), reservation);
        Ok(issued)
    }

    fn cancel(&self, reservation_id: &str) -> Result<Issued, PlatformError> {
        let reservation = match self.book.take(reservation_id) {
            Some(existing) => AlphaReservation {
                status: STATUS_CANCELLED.to_string(),
                ..existing
            },
            None => AlphaReservation {
                reservation_id: reservation_id.to_string(),
                status: STATUS_CANCELLED.to_string(),
                ..AlphaReservation::default()
            },
        };
        Issued::encode(SourceType::Alpha, reservation_id, &reservation)
    }

    fn has_reservation(&self, reservation_id: &str) -> bool {
        self.book.contains(reservation_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roomsync_broker::translator::{TranslationContext, alpha};
    use roomsync_core::event::EventStatus;
    use roomsync_core::source::EventKind;
    use roomsync_testing::mocks::test_clock;
    use uuid::Uuid;

    fn stay() -> StayRange {
        StayRange::new(
            chrono::NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 8, 18).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn booking_payload_translates_back() {
        let platform = AlphaPlatform::new(Arc::new(test_clock()));
        let issued = platform.book("R-101", "김민수", stay()).unwrap();

        assert!(issued.reservation_id.starts_with("YNJ-"));
        assert!(platform.has_reservation(&issued.reservation_id));

        let ctx = TranslationContext {
            event_id: Uuid::nil(),
            delivery_id: "d-1",
            kind: EventKind::Booking,
            received_at: test_clock().now(),
        };
        let event = alpha::translator()
            .translate(&issued.payload.to_string(), &ctx)
            .unwrap();

        assert_eq!(event.source_reservation_id, issued.reservation_id);
        assert_eq!(event.room_ref.as_deref(), Some("R-101"));
        assert_eq!(event.status, EventStatus::Confirmed);
        assert_eq!(event.stay, Some(stay()));
        assert_eq!(issued.payload["bookedAt"], "2025-01-01T09:00:00");
    }

    #[test]
    fn cancelling_unknown_id_issues_minimal_payload() {
        let platform = AlphaPlatform::new(Arc::new(test_clock()));
        let issued = platform.cancel("YNJ-MISSING").unwrap();

        assert_eq!(
            issued.payload,
            serde_json::json!({ "reservationId": "YNJ-MISSING", "status": "취소" })
        );
    }

    #[test]
    fn cancelling_removes_the_reservation() {
        let platform = AlphaPlatform::new(Arc::new(test_clock()));
        let booked = platform.book("R-101", "김민수", stay()).unwrap();
        let cancelled = platform.cancel(&booked.reservation_id).unwrap();

        assert!(!platform.has_reservation(&booked.reservation_id));
        assert_eq!(cancelled.payload["status"], "취소");
        assert_eq!(cancelled.payload["roomId"], "R-101");
    }
}
