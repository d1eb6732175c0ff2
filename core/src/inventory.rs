//! Per-room, per-date inventory records.
//!
//! Inventory is sparse: a date with no [`InventoryDay`] row is available. Rows
//! are created lazily the first time a date is booked or blocked.
//!
//! ```text
//! AVAILABLE ──book()────────▶ BOOKED  ──release()──▶ AVAILABLE
//! AVAILABLE ──block(reason)─▶ BLOCKED ──release()──▶ AVAILABLE
//! ```
//!
//! `BOOKED` and `BLOCKED` never transition directly into each other.

use crate::ids::{ReservationId, RoomId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Availability status of one room-night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    /// Free to book
    #[default]
    Available,
    /// Held by a reservation
    Booked,
    /// Taken out of sale (maintenance, owner use)
    Blocked,
}

impl InventoryStatus {
    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Booked => "BOOKED",
            Self::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from inventory transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The date is not available.
    #[error("{date} is {status}, not AVAILABLE")]
    NotAvailable {
        /// Date of the row
        date: NaiveDate,
        /// Current status
        status: InventoryStatus,
    },
}

/// Availability of one room on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDay {
    /// Room
    pub room_id: RoomId,
    /// Night
    pub date: NaiveDate,
    /// Current status
    pub status: InventoryStatus,
    /// Reservation holding the night, when booked
    pub reservation_id: Option<ReservationId>,
    /// Why the night is blocked, when blocked
    pub block_reason: Option<String>,
}

impl InventoryDay {
    /// A fresh available row
    #[must_use]
    pub const fn available(room_id: RoomId, date: NaiveDate) -> Self {
        Self {
            room_id,
            date,
            status: InventoryStatus::Available,
            reservation_id: None,
            block_reason: None,
        }
    }

    /// Whether the night can be booked or blocked
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.status, InventoryStatus::Available)
    }

    /// Books the night for a reservation.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotAvailable`] if the night is booked or blocked.
    pub fn book(&mut self, reservation_id: ReservationId) -> Result<(), InventoryError> {
        self.ensure_available()?;
        self.status = InventoryStatus::Booked;
        self.reservation_id = Some(reservation_id);
        Ok(())
    }

    /// Blocks the night.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotAvailable`] if the night is booked or blocked.
    pub fn block(&mut self, reason: impl Into<String>) -> Result<(), InventoryError> {
        self.ensure_available()?;
        self.status = InventoryStatus::Blocked;
        self.block_reason = Some(reason.into());
        Ok(())
    }

    /// Returns the night to sale, dropping any reservation link or block reason.
    pub fn release(&mut self) {
        self.status = InventoryStatus::Available;
        self.reservation_id = None;
        self.block_reason = None;
    }

    const fn ensure_available(&self) -> Result<(), InventoryError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(InventoryError::NotAvailable {
                date: self.date,
                status: self.status,
            })
        }
    }
}
