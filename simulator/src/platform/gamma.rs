//! Source `C`: a batch-oriented platform with numeric states, compact dates
//! and epoch seconds.

use super::{Issued, PlatformError, PlatformSimulator, ReservationBook, prefixed_id};
use rand::Rng;
use rand::seq::SliceRandom;
use roomsync_broker::translator::time::COMPACT_DATE;
use roomsync_core::environment::Clock;
use roomsync_core::event::StayRange;
use roomsync_core::source::SourceType;
use serde::Serialize;
use std::sync::Arc;

const STATE_BOOKED: i64 = 1;
const STATE_CANCELLED: i64 = 2;

const ROOM_TYPE_NAMES: [&str; 5] = ["스탠다드", "디럭스", "트윈", "온돌방", "복층"];
const PAY_METHODS: [&str; 3] = ["CARD", "PHONE", "BANK_TRANSFER"];

/// Room type id the platform uses for `room_code`
#[must_use]
pub fn room_type_id(room_code: &str) -> String {
    format!("RT-{room_code}")
}

/// Accommodation id the platform reports alongside `room_code`
#[must_use]
pub fn accommodation_id(room_code: &str) -> String {
    format!("ACC-{room_code}")
}

/// Native reservation payload.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaReservation {
    /// `YEO-` order id
    pub order_id: String,
    /// `ACC-` accommodation id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accommodation_id: Option<String>,
    /// `RT-` room type id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type_id: Option<String>,
    /// Room type display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type_name: Option<String>,
    /// `yyyyMMdd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// `yyyyMMdd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Buyer name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    /// Digits only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_tel: Option<String>,
    /// Whole currency units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<i64>,
    /// Payment method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_method: Option<String>,
    /// 1 booked, 2 cancelled, 3 completed, 4 no-show
    pub state: i64,
    /// Epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_ts: Option<i64>,
    /// Epoch seconds
    pub last_modified_ts: i64,
}

/// Source `C` simulator.
pub struct GammaPlatform {
    clock: Arc<dyn Clock>,
    book: ReservationBook<GammaReservation>,
}

impl GammaPlatform {
    /// Create an empty platform
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            book: ReservationBook::default(),
        }
    }
}

impl PlatformSimulator for GammaPlatform {
    fn source(&self) -> SourceType {
        SourceType::Gamma
    }

    fn book(&self, room: &str, guest: &str, stay: StayRange) -> Result<Issued, PlatformError> {
        let mut rng = rand::thread_rng();
        let now = self.clock.now().timestamp();
        let nightly = 40_000 + rng.gen_range(0..120_000_i64);

        let reservation = GammaReservation {
            order_id: prefixed_id("YEO-"),
            accommodation_id: Some(accommodation_id(room)),
            room_type_id: Some(room_type_id(room)),
            room_type_name: ROOM_TYPE_NAMES.choose(&mut rng).map(ToString::to_string),
            start_date: Some(stay.check_in().format(COMPACT_DATE).to_string()),
            end_date: Some(stay.check_out().format(COMPACT_DATE).to_string()),
            buyer_name: Some(guest.to_string()),
            buyer_tel: Some(format!("010{}", rng.gen_range(10_000_000..100_000_000))),
            total_amount: Some(stay.nights() * nightly),
            pay_method: PAY_METHODS.choose(&mut rng).map(ToString::to_string),
            state: STATE_BOOKED,
            registered_ts: Some(now),
            last_modified_ts: now,
        };

        let issued = Issued::encode(SourceType::Gamma, &reservation.order_id, &reservation)?;
        self.book.store(reservation.order_id.clone(), reservation);
        Ok(issued)
    }

    fn cancel(&self, reservation_id: &str) -> Result<Issued, PlatformError> {
        let last_modified_ts = self.clock.now().timestamp();
        let reservation = match self.book.take(reservation_id) {
            Some(existing) => GammaReservation {
                state: STATE_CANCELLED,
                last_modified_ts,
                ..existing
            },
            None => GammaReservation {
                order_id: reservation_id.to_string(),
                state: STATE_CANCELLED,
                last_modified_ts,
                ..GammaReservation::default()
            },
        };
        Issued::encode(SourceType::Gamma, reservation_id, &reservation)
    }

    fn has_reservation(&self, reservation_id: &str) -> bool {
        self.book.contains(reservation_id)
    }
}
