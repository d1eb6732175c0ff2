//! Canonical event model.
//!
//! Every translator produces a [`CanonicalEvent`] and the reconciler consumes
//! nothing else. A canonical event is created once, never mutated, and
//! discarded after reconciliation; the audit trail keeps a copy.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use roomsync_core::event::StayRange;
//!
//! let stay = StayRange::new(
//!     NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
//!     NaiveDate::from_ymd_opt(2025, 8, 18).unwrap(),
//! )
//! .unwrap();
//!
//! assert_eq!(stay.nights(), 3);
//! assert_eq!(stay.dates().count(), 3);
//! ```

use crate::source::{EventKind, SourceType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a stay range is empty or inverted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("check-in {check_in} must be before check-out {check_out}")]
pub struct InvalidStayRange {
    /// Requested check-in date
    pub check_in: NaiveDate,
    /// Requested check-out date
    pub check_out: NaiveDate,
}

/// Half-open date range `[check_in, check_out)` of at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStayRange")]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Deserialize)]
struct RawStayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl TryFrom<RawStayRange> for StayRange {
    type Error = InvalidStayRange;

    fn try_from(raw: RawStayRange) -> Result<Self, Self::Error> {
        Self::new(raw.check_in, raw.check_out)
    }
}

impl StayRange {
    /// Creates a stay range.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStayRange`] unless `check_in < check_out`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, InvalidStayRange> {
        if check_in < check_out {
            Ok(Self {
                check_in,
                check_out,
            })
        } else {
            Err(InvalidStayRange {
                check_in,
                check_out,
            })
        }
    }

    /// First night of the stay
    #[must_use]
    pub const fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    /// Departure date (not a night of the stay)
    #[must_use]
    pub const fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Every night of the stay in order, excluding the check-out date.
    pub fn dates(self) -> impl Iterator<Item = NaiveDate> {
        let check_out = self.check_out;
        self.check_in
            .iter_days()
            .take_while(move |date| *date < check_out)
    }

    /// Whether `date` is a night of this stay
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// Whether the two stays share at least one night
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

impl fmt::Display for StayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.check_in, self.check_out)
    }
}

/// Canonical reservation status after per-source mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Reservation accepted by the source
    Confirmed,
    /// Reservation cancelled or denied
    Cancelled,
    /// Guest did not arrive
    NoShow,
    /// Anything the source has not settled (and every unknown value)
    #[default]
    Pending,
    /// Stay finished
    Completed,
}

impl EventStatus {
    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NOSHOW",
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monetary amount in minor units.
///
/// Sources report amounts in their own currency; roomsync only carries the
/// figure through to the reservation and never prices anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    /// Creates an amount from minor units
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from a decimal figure, rounded to two places
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // payouts are far below i64::MAX cents
    pub fn from_decimal(value: f64) -> Self {
        Self((value * 100.0).round() as i64)
    }

    /// The amount in minor units
    #[must_use]
    pub const fn minor(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Guest contact details as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Guest {
    /// Display name
    pub name: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// Email address
    pub email: Option<String>,
}

/// The normalized, source-agnostic reservation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Identifier minted at translation time
    pub event_id: Uuid,
    /// Effective delivery id resolved by the ingestion router
    pub delivery_id: String,
    /// Upstream source
    pub source: SourceType,
    /// Reservation id in the source's own namespace
    pub source_reservation_id: String,
    /// Booking or cancellation
    pub kind: EventKind,
    /// Room (listing) id in the source's own namespace
    pub room_ref: Option<String>,
    /// Property id in the source's own namespace, when the source reports one
    pub property_ref: Option<String>,
    /// Property display name
    pub property_name: Option<String>,
    /// Property address
    pub property_address: Option<String>,
    /// Stay dates; always present for bookings, optional for cancellations
    pub stay: Option<StayRange>,
    /// Guest contact details
    pub guest: Guest,
    /// Total reported by the source
    pub total_amount: Amount,
    /// Canonical status after per-source mapping
    pub status: EventStatus,
    /// When the source says the change happened
    pub occurred_at: DateTime<Utc>,
    /// When roomsync translated the event
    pub received_at: DateTime<Utc>,
    /// Source payload kept for audit
    pub raw_payload: String,
}

impl CanonicalEvent {
    /// The reservation dedup key of this event
    #[must_use]
    pub fn reservation_key(&self) -> crate::reservation::ReservationKey {
        crate::reservation::ReservationKey::new(self.source, self.source_reservation_id.clone())
    }
}
