//! Audit trail of reconciled events.
//!
//! One [`EventAuditRecord`] is written for every canonical event the
//! reconciler sees, whatever the outcome. Records are created before any
//! domain mutation, updated once to mark the outcome, and never deleted.

use crate::event::{Amount, CanonicalEvent, EventStatus, Guest, StayRange};
use crate::ids::{ReservationId, RoomId};
use crate::source::{EventKind, SourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record of one reconciled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAuditRecord {
    /// Canonical event id
    pub event_id: Uuid,
    /// Delivery id the event arrived with
    pub delivery_id: String,
    /// Upstream source
    pub source: SourceType,
    /// Reservation id in the source's namespace
    pub source_reservation_id: String,
    /// Booking or cancellation
    pub kind: EventKind,
    /// Room id in the source's namespace
    pub room_ref: Option<String>,
    /// Stay dates
    pub stay: Option<StayRange>,
    /// Guest contact details
    pub guest: Guest,
    /// Total reported by the source
    pub total_amount: Amount,
    /// Property display name
    pub property_name: Option<String>,
    /// Property address
    pub property_address: Option<String>,
    /// Canonical status
    pub status: EventStatus,
    /// Source-reported time
    pub occurred_at: DateTime<Utc>,
    /// Translation time
    pub received_at: DateTime<Utc>,
    /// Source payload
    pub raw_payload: String,
    /// When the record was first written
    pub recorded_at: DateTime<Utc>,
    /// Whether reconciliation succeeded
    pub processed: bool,
    /// When the outcome was recorded
    pub processed_at: Option<DateTime<Utc>>,
    /// Failure reason, when reconciliation was rejected
    pub error_message: Option<String>,
    /// Room resolved on success
    pub room_id: Option<RoomId>,
    /// Reservation touched on success
    pub reservation_id: Option<ReservationId>,
}

impl EventAuditRecord {
    /// Copies the canonical fields of an event into a fresh, unprocessed record.
    #[must_use]
    pub fn from_event(event: &CanonicalEvent, recorded_at: DateTime<Utc>) -> Self {
        Self {
            event_id: event.event_id,
            delivery_id: event.delivery_id.clone(),
            source: event.source,
            source_reservation_id: event.source_reservation_id.clone(),
            kind: event.kind,
            room_ref: event.room_ref.clone(),
            stay: event.stay,
            guest: event.guest.clone(),
            total_amount: event.total_amount,
            property_name: event.property_name.clone(),
            property_address: event.property_address.clone(),
            status: event.status,
            occurred_at: event.occurred_at,
            received_at: event.received_at,
            raw_payload: event.raw_payload.clone(),
            recorded_at,
            processed: false,
            processed_at: None,
            error_message: None,
            room_id: None,
            reservation_id: None,
        }
    }

    /// Marks the record processed with the resolved room and reservation.
    pub fn mark_processed(
        &mut self,
        room_id: RoomId,
        reservation_id: Option<ReservationId>,
        at: DateTime<Utc>,
    ) {
        self.processed = true;
        self.processed_at = Some(at);
        self.error_message = None;
        self.room_id = Some(room_id);
        self.reservation_id = reservation_id;
    }

    /// Marks the record failed with a reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.processed = false;
        self.processed_at = Some(at);
        self.error_message = Some(reason.into());
        self.room_id = None;
        self.reservation_id = None;
    }

    /// Whether the outcome has been recorded
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.processed_at.is_some()
    }
}
