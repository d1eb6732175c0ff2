//! Source `B`: a global host platform with split guest names and epoch millis.

use super::{Issued, PlatformError, PlatformSimulator, ReservationBook};
use rand::Rng;
use rand::seq::SliceRandom;
use roomsync_broker::translator::time::ISO_DATE;
use roomsync_core::environment::Clock;
use roomsync_core::event::StayRange;
use roomsync_core::source::SourceType;
use serde::Serialize;
use std::sync::Arc;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 10;

const CURRENCIES: [&str; 4] = ["USD", "KRW", "EUR", "JPY"];
const CANCEL_POLICIES: [&str; 3] = ["FLEXIBLE", "MODERATE", "STRICT"];
const TIMEZONES: [&str; 4] = ["Asia/Seoul", "America/New_York", "Europe/London", "Asia/Tokyo"];

/// Listing id the platform uses for `room_code`
#[must_use]
pub fn listing_id(room_code: &str) -> String {
    format!("LST-{room_code}")
}

/// Native reservation payload.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaReservation {
    /// Ten-character confirmation code
    pub confirmation_code: String,
    /// `LST-` listing id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<String>,
    /// Host id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    /// `yyyy-MM-dd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<String>,
    /// `yyyy-MM-dd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<String>,
    /// Night count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nights: Option<i64>,
    /// First name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_first_name: Option<String>,
    /// Last name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_last_name: Option<String>,
    /// Email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<String>,
    /// Party size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_guests: Option<u32>,
    /// Payout after host fee
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_payout: Option<f64>,
    /// Host fee
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_service_fee: Option<f64>,
    /// Cleaning fee
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaning_fee: Option<f64>,
    /// ISO currency code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// English status enum
    pub status: String,
    /// Cancellation policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_policy: Option<String>,
    /// Listing timezone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Epoch millis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Epoch millis
    pub updated_at: i64,
}

/// Source `B` simulator.
pub struct BetaPlatform {
    clock: Arc<dyn Clock>,
    book: ReservationBook<BetaReservation>,
}

impl BetaPlatform {
    /// Create an empty platform
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            book: ReservationBook::default(),
        }
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }
}

/// Split at the first space; a single word is all first name.
fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn confirmation_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| char::from(CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())]))
        .collect()
}

impl PlatformSimulator for BetaPlatform {
    fn source(&self) -> SourceType {
        SourceType::Beta
    }

    #[allow(clippy::cast_precision_loss)]
    fn book(&self, room: &str, guest: &str, stay: StayRange) -> Result<Issued, PlatformError> {
        let mut rng = rand::thread_rng();
        let now = self.now_millis();
        let (first, last) = split_name(guest);

        let nightly = 80.0 + rng.gen_range(0.0..300.0);
        let cleaning = 30.0 + rng.gen_range(0.0..70.0);
        let subtotal = nightly * stay.nights() as f64 + cleaning;
        let host_fee = subtotal * 0.03;

        let reservation = BetaReservation {
            confirmation_code: confirmation_code(&mut rng),
            listing_id: Some(listing_id(room)),
            host_id: Some(format!("HOST-{}", rng.gen_range(1000..10_000))),
            check_in: Some(stay.check_in().format(ISO_DATE).to_string()),
            check_out: Some(stay.check_out().format(ISO_DATE).to_string()),
            nights: Some(stay.nights()),
            guest_email: Some(format!(
                "{}{}@email.com",
                first.to_lowercase(),
                rng.gen_range(0..100)
            )),
            guest_first_name: Some(first),
            guest_last_name: Some(last),
            number_of_guests: Some(rng.gen_range(1..=4)),
            total_payout: Some(round_cents(subtotal - host_fee)),
            host_service_fee: Some(round_cents(host_fee)),
            cleaning_fee: Some(round_cents(cleaning)),
            currency: CURRENCIES.choose(&mut rng).map(ToString::to_string),
            status: "ACCEPTED".to_string(),
            cancellation_policy: CANCEL_POLICIES.choose(&mut rng).map(ToString::to_string),
            timezone: TIMEZONES.choose(&mut rng).map(ToString::to_string),
            created_at: Some(now),
            updated_at: now,
        };

        let issued = Issued::encode(SourceType::Beta, &reservation.confirmation_code, &reservation)?;
        self.book.store(reservation.confirmation_code.clone(), reservation);
        Ok(issued)
    }

    fn cancel(&self, reservation_id: &str) -> Result<Issued, PlatformError> {
        let updated_at = self.now_millis();
        let reservation = match self.book.take(reservation_id) {
            Some(existing) => BetaReservation {
                status: "CANCELLED".to_string(),
                updated_at,
                ..existing
            },
            None => BetaReservation {
                confirmation_code: reservation_id.to_string(),
                status: "CANCELLED".to_string(),
                updated_at,
                ..BetaReservation::default()
            },
        };
        Issued::encode(SourceType::Beta, reservation_id, &reservation)
    }

    fn has_reservation(&self, reservation_id: &str) -> bool {
        self.book.contains(reservation_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roomsync_broker::translator::{TranslationContext, beta};
    use roomsync_core::event::EventStatus;
    use roomsync_core::source::EventKind;
    use roomsync_testing::mocks::test_clock;
    use uuid::Uuid;

    #[test]
    fn names_split_at_the_first_space() {
        assert_eq!(split_name("Minsu Kim"), ("Minsu".into(), "Kim".into()));
        assert_eq!(split_name("Jane van Dyke"), ("Jane".into(), "van Dyke".into()));
        assert_eq!(split_name("Cher"), ("Cher".into(), String::new()));
    }

    #[test]
    fn confirmation_codes_are_ten_alphanumerics() {
        let code = confirmation_code(&mut rand::thread_rng());
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
    }

    #[test]
    fn booking_then_cancel_translates_back() {
        let platform = BetaPlatform::new(Arc::new(test_clock()));
        let stay = StayRange::new(
            chrono::NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 9, 3).unwrap(),
        )
        .unwrap();
        let booked = platform.book("R-201", "Jihyun Park", stay).unwrap();
        let cancelled = platform.cancel(&booked.reservation_id).unwrap();

        let ctx = TranslationContext {
            event_id: Uuid::nil(),
            delivery_id: "d-1",
            kind: EventKind::Cancellation,
            received_at: test_clock().now(),
        };
        let event = beta::translator()
            .translate(&cancelled.payload.to_string(), &ctx)
            .unwrap();

        assert_eq!(event.source_reservation_id, booked.reservation_id);
        assert_eq!(event.room_ref.as_deref(), Some("LST-R-201"));
        assert_eq!(event.guest.name.as_deref(), Some("Jihyun Park"));
        assert_eq!(event.status, EventStatus::Cancelled);
        assert_eq!(event.stay, Some(stay));
        assert!(!platform.has_reservation(&booked.reservation_id));
    }
}
