//! Reservations and their lifecycle.
//!
//! A reservation is unique per [`ReservationKey`], the pair of source and the
//! source's own reservation id. It is created `CONFIRMED` and may move exactly
//! once into one of the terminal states.
//!
//! ```text
//! CONFIRMED ──cancel()──────▶ CANCELLED
//!     │ ────complete()──────▶ COMPLETED
//!     └─────mark_no_show()──▶ NOSHOW
//! ```

use crate::event::{Amount, Guest, StayRange};
use crate::ids::{ReservationId, RoomId};
use crate::source::SourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Natural dedup key of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReservationKey {
    /// Upstream source
    pub source: SourceType,
    /// Reservation id in the source's namespace
    pub source_reservation_id: String,
}

impl ReservationKey {
    /// Creates a key
    #[must_use]
    pub fn new(source: SourceType, source_reservation_id: impl Into<String>) -> Self {
        Self {
            source,
            source_reservation_id: source_reservation_id.into(),
        }
    }
}

impl fmt::Display for ReservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.code(), self.source_reservation_id)
    }
}

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Active reservation holding inventory
    Confirmed,
    /// Cancelled; inventory released
    Cancelled,
    /// Stay finished
    Completed,
    /// Guest never arrived
    NoShow,
}

impl ReservationStatus {
    /// Terminal statuses accept no further transitions
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Confirmed)
    }

    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
            Self::NoShow => "NOSHOW",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from reservation state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// The reservation already reached a terminal status.
    #[error("reservation {key} is already {status}")]
    AlreadyTerminal {
        /// Reservation key
        key: ReservationKey,
        /// Current terminal status
        status: ReservationStatus,
    },
}

/// A reconciled reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Internal identifier
    pub id: ReservationId,
    /// Dedup key
    pub key: ReservationKey,
    /// Room holding the inventory
    pub room_id: RoomId,
    /// Booked nights
    pub stay: StayRange,
    /// Guest contact details
    pub guest: Guest,
    /// Total reported by the source
    pub total_amount: Amount,
    /// Current status
    pub status: ReservationStatus,
    /// When the source says the booking happened
    pub booked_at: DateTime<Utc>,
    /// When the reservation was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Creates a confirmed reservation.
    #[must_use]
    pub const fn confirmed(
        id: ReservationId,
        key: ReservationKey,
        room_id: RoomId,
        stay: StayRange,
        guest: Guest,
        total_amount: Amount,
        booked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            key,
            room_id,
            stay,
            guest,
            total_amount,
            status: ReservationStatus::Confirmed,
            booked_at,
            cancelled_at: None,
        }
    }

    /// Whether the reservation still holds inventory
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, ReservationStatus::Confirmed)
    }

    /// Cancels the reservation.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::AlreadyTerminal`] unless the reservation is confirmed.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), ReservationError> {
        self.transition(ReservationStatus::Cancelled)?;
        self.cancelled_at = Some(at);
        Ok(())
    }

    /// Marks the stay as completed.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::AlreadyTerminal`] unless the reservation is confirmed.
    pub fn complete(&mut self) -> Result<(), ReservationError> {
        self.transition(ReservationStatus::Completed)
    }

    /// Marks the guest as a no-show.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::AlreadyTerminal`] unless the reservation is confirmed.
    pub fn mark_no_show(&mut self) -> Result<(), ReservationError> {
        self.transition(ReservationStatus::NoShow)
    }

    /// Replaces guest details with any newer values reported by the source.
    pub fn update_guest(&mut self, guest: Guest) {
        if guest.name.is_some() {
            self.guest.name = guest.name;
        }
        if guest.phone.is_some() {
            self.guest.phone = guest.phone;
        }
        if guest.email.is_some() {
            self.guest.email = guest.email;
        }
    }

    fn transition(&mut self, to: ReservationStatus) -> Result<(), ReservationError> {
        if self.status.is_terminal() {
            return Err(ReservationError::AlreadyTerminal {
                key: self.key.clone(),
                status: self.status,
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reservation() -> Reservation {
        let stay = StayRange::new(
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 18).unwrap(),
        )
        .unwrap();
        Reservation::confirmed(
            ReservationId::new(),
            ReservationKey::new(SourceType::Alpha, "YNJ-0001"),
            RoomId::new(),
            stay,
            Guest::default(),
            Amount::from_minor(300_000),
            Utc::now(),
        )
    }

    #[test]
    fn cancel_is_terminal() {
        let mut r = reservation();
        r.cancel(Utc::now()).unwrap();
        assert_eq!(r.status, ReservationStatus::Cancelled);
        assert!(r.cancelled_at.is_some());
        assert!(!r.is_active());

        let err = r.complete().unwrap_err();
        assert_eq!(err.to_string(), "reservation A:YNJ-0001 is already CANCELLED");
    }

    #[test]
    fn complete_and_no_show_are_terminal() {
        let mut completed = reservation();
        completed.complete().unwrap();
        assert!(completed.cancel(Utc::now()).is_err());
        assert!(completed.cancelled_at.is_none());

        let mut no_show = reservation();
        no_show.mark_no_show().unwrap();
        assert_eq!(no_show.status, ReservationStatus::NoShow);
        assert!(no_show.mark_no_show().is_err());
    }

    #[test]
    fn update_guest_keeps_known_fields() {
        let mut r = reservation();
        r.guest.name = Some("Kim".to_string());
        r.update_guest(Guest {
            name: None,
            phone: Some("010-1234-5678".to_string()),
            email: None,
        });
        assert_eq!(r.guest.name.as_deref(), Some("Kim"));
        assert_eq!(r.guest.phone.as_deref(), Some("010-1234-5678"));
    }
}
