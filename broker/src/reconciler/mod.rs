//! Reconciler: applies canonical events to room inventory.
//!
//! Every event resolves to one internal room. Work on a room is serialized by
//! a per-room async lock, so the availability check and the writes it guards
//! can never interleave with another event for the same room. Different rooms
//! proceed in parallel.
//!
//! Each call persists one [`LedgerCommit`]: the audit record for the event
//! plus every row the ledger changed. Business rejections (unknown property,
//! unknown room, dates taken) are recorded in the audit log and returned as an
//! unsuccessful [`ProcessingResult`]. Only backend failures surface as
//! [`ReconcileError`].

use crate::metrics;
use crate::store::{LedgerCommit, LedgerRepository, RepositoryError};
use chrono::NaiveDate;
use roomsync_core::audit::EventAuditRecord;
use roomsync_core::event::{CanonicalEvent, StayRange};
use roomsync_core::ids::RoomId;
use roomsync_core::inventory::InventoryStatus;
use roomsync_core::reducer::Reducer;
use roomsync_core::reservation::{Reservation, ReservationKey};
use roomsync_core::room::{DirectoryError, Room, RoomDirectory};
use roomsync_core::source::EventKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

/// Room ledger reducer
pub mod ledger;

pub use ledger::{LedgerAction, LedgerEnvironment, LedgerOutcome, LedgerReducer, RoomLedger};

/// Why an event was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The event names a property that is not registered
    UnknownProperty,
    /// The event's room has no active mapping
    UnknownRoom,
    /// At least one night is not available
    NotAvailable,
}

impl FailureReason {
    /// Stable code written to the audit log
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownProperty => "UNKNOWN_PROPERTY",
            Self::UnknownRoom => "UNKNOWN_ROOM",
            Self::NotAvailable => "NOT_AVAILABLE",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingOutcome {
    /// A reservation was created
    Booked,
    /// A reservation was cancelled
    Cancelled,
    /// Cancellation of an unknown reservation; nothing to do
    CancellationIgnored,
    /// A redelivery of something already applied
    AlreadyApplied,
    /// Not applied; see [`ProcessingResult::failure_reason`]
    Rejected,
}

impl ProcessingOutcome {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Cancelled => "cancelled",
            Self::CancellationIgnored => "cancellation_ignored",
            Self::AlreadyApplied => "already_applied",
            Self::Rejected => "rejected",
        }
    }
}

/// Result of reconciling one event.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    /// Whether the event was applied (or was a harmless no-op)
    pub success: bool,
    /// Set when `success` is false
    pub failure_reason: Option<FailureReason>,
    /// Resolved room
    pub room: Option<Room>,
    /// Reservation created or touched
    pub reservation: Option<Reservation>,
    /// What happened
    pub outcome: ProcessingOutcome,
}

impl ProcessingResult {
    fn applied(outcome: ProcessingOutcome, room: Room, reservation: Option<Reservation>) -> Self {
        Self {
            success: true,
            failure_reason: None,
            room: Some(room),
            reservation,
            outcome,
        }
    }

    fn rejected(reason: FailureReason, room: Option<Room>) -> Self {
        Self {
            success: false,
            failure_reason: Some(reason),
            room,
            reservation: None,
            outcome: ProcessingOutcome::Rejected,
        }
    }
}

/// Infrastructure failures during reconciliation.
#[derive(Error, Debug, Clone)]
pub enum ReconcileError {
    /// Ledger backend failed
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Room directory failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A direct ledger command named a reservation that does not exist
    #[error("reservation {0} not found")]
    ReservationNotFound(ReservationKey),

    /// The ledger reported an outcome the event path does not produce
    #[error("unexpected ledger outcome: {0}")]
    UnexpectedOutcome(String),
}

/// Per-room async locks.
///
/// Locks are created on first use and kept for the life of the process.
#[derive(Debug, Default)]
pub struct RoomLocks {
    locks: Mutex<HashMap<RoomId, Arc<tokio::sync::Mutex<()>>>>,
}

impl RoomLocks {
    /// Create an empty lock table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a room
    pub async fn acquire(&self, room_id: RoomId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(room_id).or_default())
        };
        lock.lock_owned().await
    }
}

/// Applies canonical events and direct ledger commands to room inventory.
pub struct Reconciler {
    directory: Arc<dyn RoomDirectory>,
    repository: Arc<dyn LedgerRepository>,
    env: LedgerEnvironment,
    reducer: LedgerReducer,
    locks: RoomLocks,
}

impl Reconciler {
    /// Creates a new `Reconciler`
    #[must_use]
    pub fn new(
        directory: Arc<dyn RoomDirectory>,
        repository: Arc<dyn LedgerRepository>,
        env: LedgerEnvironment,
    ) -> Self {
        Self {
            directory,
            repository,
            env,
            reducer: LedgerReducer::new(),
            locks: RoomLocks::new(),
        }
    }

    /// Reconcile one canonical event.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the directory or the ledger backend
    /// fails. Nothing is written in that case, not even the audit record.
    #[tracing::instrument(
        skip_all,
        fields(
            event_id = %event.event_id,
            source = %event.source,
            kind = %event.kind,
            reservation = %event.source_reservation_id,
        )
    )]
    pub async fn process(&self, event: CanonicalEvent) -> Result<ProcessingResult, ReconcileError> {
        let started = Instant::now();
        let audit = EventAuditRecord::from_event(&event, self.env.clock.now());

        let result = self.route(&event, audit).await;

        match &result {
            Ok(processed) => {
                metrics::record_reconcile(event.kind, processed.outcome, started.elapsed());
                match processed.failure_reason {
                    Some(reason) => tracing::warn!(reason = %reason, "Event rejected"),
                    None => tracing::info!(outcome = processed.outcome.as_str(), "Event reconciled"),
                }
            },
            Err(e) => tracing::error!(error = %e, "Reconciliation failed"),
        }
        result
    }

    async fn route(
        &self,
        event: &CanonicalEvent,
        audit: EventAuditRecord,
    ) -> Result<ProcessingResult, ReconcileError> {
        let room = match event.room_ref.as_deref() {
            Some(room_ref) => self.directory.resolve_room(event.source, room_ref).await?,
            None => None,
        };
        let property_known = match event.property_ref.as_deref() {
            Some(property_ref) => self
                .directory
                .resolve_property(event.source, property_ref)
                .await?
                .is_some(),
            None => true,
        };

        // The room mapping is the only gate; the property only names the
        // rejection when no room resolves.
        let Some(room) = room else {
            let reason = if property_known {
                FailureReason::UnknownRoom
            } else {
                FailureReason::UnknownProperty
            };
            return self.reject(audit, reason, None).await;
        };
        if !property_known {
            tracing::debug!(
                property_ref = event.property_ref.as_deref().unwrap_or_default(),
                room_id = %room.id,
                "Property not mapped; continuing with resolved room"
            );
        }

        match event.kind {
            EventKind::Booking => self.book(event, room, audit).await,
            EventKind::Cancellation => self.cancel(event, room, audit).await,
        }
    }

    async fn book(
        &self,
        event: &CanonicalEvent,
        room: Room,
        audit: EventAuditRecord,
    ) -> Result<ProcessingResult, ReconcileError> {
        let Some(stay) = event.stay else {
            return self.reject(audit, FailureReason::NotAvailable, Some(room)).await;
        };

        let _guard = self.locks.acquire(room.id).await;
        let key = event.reservation_key();
        let existing = self.repository.find_reservation(&key).await?;
        let days = self.repository.load_days(room.id, stay).await?;
        let mut ledger = RoomLedger::load(room.id, days, existing);

        self.reducer.reduce(
            &mut ledger,
            LedgerAction::BookStay {
                key,
                stay,
                guest: event.guest.clone(),
                total_amount: event.total_amount,
                booked_at: event.occurred_at,
            },
            &self.env,
        );

        self.settle(ledger, room, audit).await
    }

    async fn cancel(
        &self,
        event: &CanonicalEvent,
        room: Room,
        audit: EventAuditRecord,
    ) -> Result<ProcessingResult, ReconcileError> {
        let key = event.reservation_key();
        let Some(found) = self.repository.find_reservation(&key).await? else {
            tracing::debug!(key = %key, "Cancellation for unknown reservation");
            return self
                .settle(RoomLedger::empty(room.id), room, audit)
                .await;
        };

        // The reservation's own room, which may differ from the event's mapping.
        let _guard = self.locks.acquire(found.room_id).await;
        let current = self.repository.find_reservation(&key).await?;
        let ledger_room = current.as_ref().map_or(found.room_id, |r| r.room_id);
        let days = match &current {
            Some(reservation) => self.repository.load_days(ledger_room, reservation.stay).await?,
            None => Vec::new(),
        };
        let mut ledger = RoomLedger::load(ledger_room, days, current);

        self.reducer
            .reduce(&mut ledger, LedgerAction::CancelReservation { key }, &self.env);

        self.settle(ledger, room, audit).await
    }

    /// Turn the ledger outcome into a result and persist everything in one commit
    async fn settle(
        &self,
        ledger: RoomLedger,
        room: Room,
        mut audit: EventAuditRecord,
    ) -> Result<ProcessingResult, ReconcileError> {
        let now = self.env.clock.now();
        let reservation = ledger.reservation().cloned();
        let result = match ledger.outcome.clone() {
            Some(LedgerOutcome::Booked(_)) => {
                ProcessingResult::applied(ProcessingOutcome::Booked, room, reservation)
            },
            Some(LedgerOutcome::Cancelled(_)) => {
                ProcessingResult::applied(ProcessingOutcome::Cancelled, room, reservation)
            },
            Some(LedgerOutcome::AlreadyApplied(_)) => {
                ProcessingResult::applied(ProcessingOutcome::AlreadyApplied, room, reservation)
            },
            Some(LedgerOutcome::Unavailable(dates)) => {
                tracing::debug!(?dates, "Requested nights are taken");
                ProcessingResult::rejected(FailureReason::NotAvailable, Some(room))
            },
            Some(LedgerOutcome::CancellationIgnored) => {
                ProcessingResult::applied(ProcessingOutcome::CancellationIgnored, room, None)
            },
            other => return Err(ReconcileError::UnexpectedOutcome(format!("{other:?}"))),
        };

        match (&result.failure_reason, &result.room) {
            (Some(reason), _) => audit.mark_failed(reason.as_str(), now),
            (None, Some(room)) => audit.mark_processed(
                room.id,
                result.reservation.as_ref().map(|r| r.id),
                now,
            ),
            (None, None) => {},
        }

        let changes = ledger.changes();
        self.repository
            .commit(LedgerCommit {
                audit: Some(audit),
                days: changes.days,
                reservations: changes.reservation.into_iter().collect(),
            })
            .await?;
        Ok(result)
    }

    async fn reject(
        &self,
        mut audit: EventAuditRecord,
        reason: FailureReason,
        room: Option<Room>,
    ) -> Result<ProcessingResult, ReconcileError> {
        audit.mark_failed(reason.as_str(), self.env.clock.now());
        self.repository.commit(LedgerCommit::audit_only(audit)).await?;
        Ok(ProcessingResult::rejected(reason, room))
    }

    // ========================================================================
    // Direct ledger commands
    // ========================================================================

    /// Apply a command to a room's ledger under its lock and persist the changes.
    async fn run_command(
        &self,
        room_id: RoomId,
        window: Option<StayRange>,
        reservation: Option<Reservation>,
        action: LedgerAction,
    ) -> Result<LedgerOutcome, ReconcileError> {
        let days = match window {
            Some(stay) => self.repository.load_days(room_id, stay).await?,
            None => Vec::new(),
        };
        let mut ledger = RoomLedger::load(room_id, days, reservation);
        self.reducer.reduce(&mut ledger, action, &self.env);

        if ledger.is_dirty() {
            let changes = ledger.changes();
            self.repository
                .commit(LedgerCommit {
                    audit: None,
                    days: changes.days,
                    reservations: changes.reservation.into_iter().collect(),
                })
                .await?;
        }
        Ok(ledger
            .outcome
            .unwrap_or_else(|| LedgerOutcome::Invalid("command produced no outcome".to_string())))
    }

    /// Take available nights of a room out of sale.
    ///
    /// Returns [`LedgerOutcome::Unavailable`] without writing if any night is
    /// booked or already blocked.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the ledger backend fails.
    pub async fn block_dates(
        &self,
        room_id: RoomId,
        stay: StayRange,
        reason: impl Into<String>,
    ) -> Result<LedgerOutcome, ReconcileError> {
        let _guard = self.locks.acquire(room_id).await;
        let reason = reason.into();
        tracing::info!(room = %room_id, %stay, %reason, "Blocking dates");
        self.run_command(room_id, Some(stay), None, LedgerAction::BlockDates { stay, reason })
            .await
    }

    /// Return blocked nights of a room to sale. Booked nights are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the ledger backend fails.
    pub async fn release_block(
        &self,
        room_id: RoomId,
        stay: StayRange,
    ) -> Result<LedgerOutcome, ReconcileError> {
        let _guard = self.locks.acquire(room_id).await;
        tracing::info!(room = %room_id, %stay, "Releasing blocked dates");
        self.run_command(room_id, Some(stay), None, LedgerAction::ReleaseBlock { stay })
            .await
    }

    /// Mark a reservation completed. Its nights stay booked.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ReservationNotFound`] for an unknown key, or
    /// [`ReconcileError::Repository`] if the backend fails.
    pub async fn complete_reservation(
        &self,
        key: &ReservationKey,
    ) -> Result<LedgerOutcome, ReconcileError> {
        self.close(key, LedgerAction::CompleteReservation { key: key.clone() })
            .await
    }

    /// Mark a reservation a no-show. Its nights stay booked.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ReservationNotFound`] for an unknown key, or
    /// [`ReconcileError::Repository`] if the backend fails.
    pub async fn mark_no_show(
        &self,
        key: &ReservationKey,
    ) -> Result<LedgerOutcome, ReconcileError> {
        self.close(key, LedgerAction::MarkNoShow { key: key.clone() })
            .await
    }

    async fn close(
        &self,
        key: &ReservationKey,
        action: LedgerAction,
    ) -> Result<LedgerOutcome, ReconcileError> {
        let found = self
            .repository
            .find_reservation(key)
            .await?
            .ok_or_else(|| ReconcileError::ReservationNotFound(key.clone()))?;
        let _guard = self.locks.acquire(found.room_id).await;
        let current = self
            .repository
            .find_reservation(key)
            .await?
            .ok_or_else(|| ReconcileError::ReservationNotFound(key.clone()))?;
        self.run_command(current.room_id, None, Some(current), action)
            .await
    }

    /// Status of every night of `stay` for a room.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the ledger backend fails.
    pub async fn availability(
        &self,
        room_id: RoomId,
        stay: StayRange,
    ) -> Result<Vec<(NaiveDate, InventoryStatus)>, ReconcileError> {
        let ledger = RoomLedger::load(room_id, self.repository.load_days(room_id, stay).await?, None);
        Ok(stay
            .dates()
            .map(|date| (date, ledger.status_on(date)))
            .collect())
    }

    /// Reservation by dedup key.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the ledger backend fails.
    pub async fn reservation(
        &self,
        key: &ReservationKey,
    ) -> Result<Option<Reservation>, ReconcileError> {
        Ok(self.repository.find_reservation(key).await?)
    }

    /// Every audit record, in commit order.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the ledger backend fails.
    pub async fn audit_log(&self) -> Result<Vec<EventAuditRecord>, ReconcileError> {
        Ok(self.repository.audit_log().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryLedgerRepository;
    use chrono::{TimeZone, Utc};
    use roomsync_core::event::{Amount, EventStatus, Guest};
    use roomsync_core::reservation::ReservationStatus;
    use roomsync_core::source::SourceType;
    use roomsync_testing::mocks::{InMemoryRoomDirectory, SequentialIds};
    use roomsync_testing::test_clock;
    use uuid::Uuid;

    struct Fixture {
        directory: Arc<InMemoryRoomDirectory>,
        repository: Arc<InMemoryLedgerRepository>,
        reconciler: Reconciler,
        room: Room,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let repository = Arc::new(InMemoryLedgerRepository::new());
        let room = directory.provision(
            "Deluxe Double",
            &[
                (SourceType::Alpha, "R-101"),
                (SourceType::Beta, "LST-R-101"),
                (SourceType::Gamma, "RT-R-101"),
            ],
        );
        let reconciler = Reconciler::new(
            directory.clone(),
            repository.clone(),
            LedgerEnvironment::new(Arc::new(test_clock()), Arc::new(SequentialIds::new())),
        );
        Fixture {
            directory,
            repository,
            reconciler,
            room,
        }
    }

    fn stay(from: u32, to: u32) -> StayRange {
        StayRange::new(
            NaiveDate::from_ymd_opt(2025, 8, from).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, to).unwrap(),
        )
        .unwrap()
    }

    fn event(
        source: SourceType,
        id: &str,
        room_ref: &str,
        kind: EventKind,
        stay: Option<StayRange>,
    ) -> CanonicalEvent {
        let at = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        CanonicalEvent {
            event_id: Uuid::new_v4(),
            delivery_id: format!("delivery-{id}"),
            source,
            source_reservation_id: id.to_string(),
            kind,
            room_ref: Some(room_ref.to_string()),
            property_ref: None,
            property_name: None,
            property_address: None,
            stay,
            guest: Guest::default(),
            total_amount: Amount::from_minor(100),
            status: EventStatus::Confirmed,
            occurred_at: at,
            received_at: at,
            raw_payload: "{}".to_string(),
        }
    }

    fn booking(source: SourceType, id: &str, room_ref: &str, stay: StayRange) -> CanonicalEvent {
        event(source, id, room_ref, EventKind::Booking, Some(stay))
    }

    #[tokio::test]
    async fn booking_creates_reservation_and_books_nights() {
        let f = fixture();
        let result = f
            .reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.outcome, ProcessingOutcome::Booked);
        assert_eq!(result.room.as_ref().unwrap().id, f.room.id);
        let reservation = result.reservation.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        let days = f.repository.days_for_room(f.room.id);
        assert_eq!(days.len(), 3);
        assert!(days.iter().all(|d| d.reservation_id == Some(reservation.id)));

        let audit = f.reconciler.audit_log().await.unwrap();
        assert_eq!(audit.len(), 1);
        assert!(audit[0].processed);
        assert_eq!(audit[0].reservation_id, Some(reservation.id));
    }

    #[tokio::test]
    async fn overlapping_booking_from_another_source_is_not_available() {
        let f = fixture();
        f.reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap();
        let before = f.repository.days_for_room(f.room.id);

        let result = f
            .reconciler
            .process(booking(SourceType::Beta, "HM-1", "LST-R-101", stay(17, 19)))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.failure_reason, Some(FailureReason::NotAvailable));
        assert_eq!(f.repository.days_for_room(f.room.id), before);
        assert_eq!(f.repository.reservations().len(), 1);
        let audit = f.reconciler.audit_log().await.unwrap();
        assert_eq!(audit[1].error_message.as_deref(), Some("NOT_AVAILABLE"));
    }

    #[tokio::test]
    async fn unknown_room_is_rejected_without_mutation() {
        let f = fixture();
        let result = f
            .reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-999", stay(15, 18)))
            .await
            .unwrap();

        assert_eq!(result.failure_reason, Some(FailureReason::UnknownRoom));
        assert!(f.repository.reservations().is_empty());
        assert_eq!(f.reconciler.audit_log().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deactivated_mapping_is_unknown_room() {
        let f = fixture();
        f.directory.deactivate(SourceType::Alpha, "R-101");
        let result = f
            .reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap();
        assert_eq!(result.failure_reason, Some(FailureReason::UnknownRoom));
    }

    #[tokio::test]
    async fn unmapped_property_does_not_block_a_mapped_room() {
        let f = fixture();
        let mut event = booking(SourceType::Gamma, "YEO-1", "RT-R-101", stay(15, 18));
        event.property_ref = Some("ACC-9".to_string());

        let result = f.reconciler.process(event).await.unwrap();

        assert!(result.success);
        assert_eq!(result.outcome, ProcessingOutcome::Booked);
        assert_eq!(result.room.unwrap().id, f.room.id);
    }

    #[tokio::test]
    async fn unmapped_property_names_the_rejection_when_no_room_resolves() {
        let f = fixture();
        let mut event = booking(SourceType::Gamma, "YEO-1", "RT-R-999", stay(15, 18));
        event.property_ref = Some("ACC-9".to_string());

        let result = f.reconciler.process(event.clone()).await.unwrap();
        assert_eq!(result.failure_reason, Some(FailureReason::UnknownProperty));

        f.directory
            .map_property(SourceType::Gamma, "ACC-9", f.room.property_id);
        let result = f.reconciler.process(event).await.unwrap();
        assert_eq!(result.failure_reason, Some(FailureReason::UnknownRoom));
        assert!(f.repository.reservations().is_empty());
    }

    #[tokio::test]
    async fn unexpected_ledger_outcome_is_an_error_and_writes_nothing() {
        let f = fixture();
        let event = booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18));
        let audit = EventAuditRecord::from_event(&event, event.received_at);
        let mut ledger = RoomLedger::empty(f.room.id);
        ledger.outcome = Some(LedgerOutcome::Blocked { nights: 1 });

        let err = f.reconciler.settle(ledger, f.room.clone(), audit).await.unwrap_err();

        assert!(matches!(err, ReconcileError::UnexpectedOutcome(_)));
        assert!(f.reconciler.audit_log().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_releases_exactly_its_own_nights() {
        let f = fixture();
        f.reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap();
        f.reconciler
            .process(booking(SourceType::Beta, "HM-2", "LST-R-101", stay(18, 20)))
            .await
            .unwrap();

        let cancelled = f
            .reconciler
            .process(event(SourceType::Alpha, "YNJ-1", "R-101", EventKind::Cancellation, None))
            .await
            .unwrap();

        assert_eq!(cancelled.outcome, ProcessingOutcome::Cancelled);
        let key = ReservationKey::new(SourceType::Alpha, "YNJ-1");
        assert_eq!(
            f.reconciler.reservation(&key).await.unwrap().unwrap().status,
            ReservationStatus::Cancelled
        );

        let statuses: Vec<_> = f
            .reconciler
            .availability(f.room.id, stay(14, 21))
            .await
            .unwrap()
            .into_iter()
            .map(|(_, status)| status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                InventoryStatus::Available,
                InventoryStatus::Available,
                InventoryStatus::Available,
                InventoryStatus::Available,
                InventoryStatus::Booked,
                InventoryStatus::Booked,
                InventoryStatus::Available,
            ]
        );

        let mut released: Vec<_> = f
            .repository
            .days_for_room(f.room.id)
            .into_iter()
            .filter(|day| day.status == InventoryStatus::Available)
            .map(|day| day.date)
            .collect();
        released.sort_unstable();
        assert_eq!(released, stay(15, 18).dates().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn cancellation_releases_nights_for_rebooking() {
        let f = fixture();
        f.reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap();

        let cancelled = f
            .reconciler
            .process(event(SourceType::Alpha, "YNJ-1", "R-101", EventKind::Cancellation, None))
            .await
            .unwrap();
        assert_eq!(cancelled.outcome, ProcessingOutcome::Cancelled);
        assert_eq!(
            cancelled.reservation.unwrap().status,
            ReservationStatus::Cancelled
        );

        let rebooked = f
            .reconciler
            .process(booking(SourceType::Gamma, "YEO-1", "RT-R-101", stay(15, 18)))
            .await
            .unwrap();
        assert_eq!(rebooked.outcome, ProcessingOutcome::Booked);
    }

    #[tokio::test]
    async fn cancelling_an_unknown_reservation_is_a_quiet_success() {
        let f = fixture();
        let result = f
            .reconciler
            .process(event(SourceType::Beta, "HM-404", "LST-R-101", EventKind::Cancellation, None))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.outcome, ProcessingOutcome::CancellationIgnored);
        assert!(result.reservation.is_none());
        assert!(f.repository.days_for_room(f.room.id).is_empty());
        assert!(f.repository.reservations().is_empty());
    }

    #[tokio::test]
    async fn redelivered_booking_is_already_applied() {
        let f = fixture();
        let first = booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18));
        f.reconciler.process(first.clone()).await.unwrap();
        let again = f.reconciler.process(first).await.unwrap();

        assert!(again.success);
        assert_eq!(again.outcome, ProcessingOutcome::AlreadyApplied);
        assert_eq!(f.repository.reservations().len(), 1);
        assert_eq!(f.repository.days_for_room(f.room.id).len(), 3);
    }

    #[tokio::test]
    async fn directory_outage_writes_nothing() {
        let f = fixture();
        f.directory.set_unavailable(true);
        let err = f
            .reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Directory(_)));
        assert!(f.reconciler.audit_log().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocked_dates_refuse_bookings_until_released() {
        let f = fixture();
        let outcome = f
            .reconciler
            .block_dates(f.room.id, stay(16, 17), "maintenance")
            .await
            .unwrap();
        assert_eq!(outcome, LedgerOutcome::Blocked { nights: 1 });

        let refused = f
            .reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap();
        assert_eq!(refused.failure_reason, Some(FailureReason::NotAvailable));

        f.reconciler
            .release_block(f.room.id, stay(15, 18))
            .await
            .unwrap();
        let accepted = f
            .reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap();
        assert!(accepted.success);

        let nights = f.reconciler.availability(f.room.id, stay(14, 19)).await.unwrap();
        let statuses: Vec<_> = nights.into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            statuses,
            vec![
                InventoryStatus::Available,
                InventoryStatus::Booked,
                InventoryStatus::Booked,
                InventoryStatus::Booked,
                InventoryStatus::Available,
            ]
        );
    }

    #[tokio::test]
    async fn completed_reservation_cannot_be_cancelled() {
        let f = fixture();
        f.reconciler
            .process(booking(SourceType::Alpha, "YNJ-1", "R-101", stay(15, 18)))
            .await
            .unwrap();
        let key = ReservationKey::new(SourceType::Alpha, "YNJ-1");

        let closed = f.reconciler.complete_reservation(&key).await.unwrap();
        assert!(matches!(closed, LedgerOutcome::Closed { status: ReservationStatus::Completed, .. }));

        let cancel = f
            .reconciler
            .process(event(SourceType::Alpha, "YNJ-1", "R-101", EventKind::Cancellation, None))
            .await
            .unwrap();
        assert_eq!(cancel.outcome, ProcessingOutcome::AlreadyApplied);
        assert_eq!(f.repository.days_for_room(f.room.id).len(), 3);
        assert!(matches!(
            f.reconciler
                .mark_no_show(&ReservationKey::new(SourceType::Alpha, "nope"))
                .await,
            Err(ReconcileError::ReservationNotFound(_))
        ));
    }
}
