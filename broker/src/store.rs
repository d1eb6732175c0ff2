//! Persistence contract for the reconciler, plus an in-memory backend.
//!
//! A reconciliation reads the inventory rows of one stay and at most one
//! reservation, then writes everything it changed in a single
//! [`LedgerRepository::commit`]. Backends must apply a commit atomically:
//! either the audit record and every row land, or nothing does.

use roomsync_core::audit::EventAuditRecord;
use roomsync_core::event::StayRange;
use roomsync_core::ids::{ReservationId, RoomId};
use roomsync_core::inventory::InventoryDay;
use roomsync_core::reservation::{Reservation, ReservationKey};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors from a ledger backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Backend could not be reached.
    #[error("Ledger repository unavailable: {0}")]
    Unavailable(String),

    /// A write would violate a uniqueness constraint.
    #[error("Ledger conflict: {0}")]
    Conflict(String),
}

/// One atomic unit of reconciliation output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerCommit {
    /// Audit record for the event being reconciled, if any
    pub audit: Option<EventAuditRecord>,
    /// Inventory rows to insert or overwrite
    pub days: Vec<InventoryDay>,
    /// Reservations to insert or overwrite
    pub reservations: Vec<Reservation>,
}

impl LedgerCommit {
    /// A commit that only records an audit entry
    #[must_use]
    pub fn audit_only(audit: EventAuditRecord) -> Self {
        Self {
            audit: Some(audit),
            ..Self::default()
        }
    }

    /// Whether the commit writes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.audit.is_none() && self.days.is_empty() && self.reservations.is_empty()
    }
}

type RepoFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Storage for inventory rows, reservations and audit records.
///
/// # Dyn Compatibility
///
/// Returns boxed futures so the reconciler can hold `Arc<dyn LedgerRepository>`.
pub trait LedgerRepository: Send + Sync {
    /// Inventory rows of `room_id` inside `stay`. Missing rows are available.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend fails.
    fn load_days(&self, room_id: RoomId, stay: StayRange) -> RepoFuture<'_, Vec<InventoryDay>>;

    /// Reservation by dedup key.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend fails.
    fn find_reservation<'a>(
        &'a self,
        key: &'a ReservationKey,
    ) -> RepoFuture<'a, Option<Reservation>>;

    /// Apply a commit atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend fails or a uniqueness
    /// constraint would be violated. Nothing is written in that case.
    fn commit(&self, commit: LedgerCommit) -> RepoFuture<'_, ()>;

    /// Every audit record, in commit order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend fails.
    fn audit_log(&self) -> RepoFuture<'_, Vec<EventAuditRecord>>;
}

#[derive(Debug, Default)]
struct LedgerTables {
    days: HashMap<RoomId, BTreeMap<chrono::NaiveDate, InventoryDay>>,
    reservations: HashMap<ReservationKey, Reservation>,
    audit: Vec<EventAuditRecord>,
}

impl LedgerTables {
    fn check(&self, commit: &LedgerCommit) -> Result<(), RepositoryError> {
        for reservation in &commit.reservations {
            if let Some(existing) = self.reservations.get(&reservation.key) {
                if existing.id != reservation.id {
                    return Err(RepositoryError::Conflict(format!(
                        "reservation {} already exists",
                        reservation.key
                    )));
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, commit: LedgerCommit) {
        for day in commit.days {
            self.days.entry(day.room_id).or_default().insert(day.date, day);
        }
        for reservation in commit.reservations {
            self.reservations.insert(reservation.key.clone(), reservation);
        }
        if let Some(audit) = commit.audit {
            self.audit.push(audit);
        }
    }
}

/// In-memory [`LedgerRepository`].
///
/// One mutex guards every table, so a commit is atomic by construction.
#[derive(Debug, Default)]
pub struct InMemoryLedgerRepository {
    tables: Mutex<LedgerTables>,
    failing: AtomicBool,
}

impl InMemoryLedgerRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`RepositoryError::Unavailable`]
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All stored rows of a room, ordered by date
    #[must_use]
    pub fn days_for_room(&self, room_id: RoomId) -> Vec<InventoryDay> {
        self.lock()
            .days
            .get(&room_id)
            .map(|days| days.values().cloned().collect())
            .unwrap_or_default()
    }

    /// All stored reservations
    #[must_use]
    pub fn reservations(&self) -> Vec<Reservation> {
        self.lock().reservations.values().cloned().collect()
    }

    /// Reservation by internal id
    #[must_use]
    pub fn reservation_by_id(&self, id: ReservationId) -> Option<Reservation> {
        self.lock()
            .reservations
            .values()
            .find(|reservation| reservation.id == id)
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("ledger offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl LedgerRepository for InMemoryLedgerRepository {
    fn load_days(&self, room_id: RoomId, stay: StayRange) -> RepoFuture<'_, Vec<InventoryDay>> {
        Box::pin(async move {
            self.check_available()?;
            let tables = self.lock();
            Ok(tables
                .days
                .get(&room_id)
                .map(|days| {
                    days.range(stay.check_in()..stay.check_out())
                        .map(|(_, day)| day.clone())
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn find_reservation<'a>(
        &'a self,
        key: &'a ReservationKey,
    ) -> RepoFuture<'a, Option<Reservation>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.lock().reservations.get(key).cloned())
        })
    }

    fn commit(&self, commit: LedgerCommit) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            self.check_available()?;
            let mut tables = self.lock();
            tables.check(&commit)?;
            tables.apply(commit);
            Ok(())
        })
    }

    fn audit_log(&self) -> RepoFuture<'_, Vec<EventAuditRecord>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.lock().audit.clone())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use roomsync_core::event::{Amount, Guest};
    use roomsync_core::source::SourceType;

    fn stay(from: u32, to: u32) -> StayRange {
        StayRange::new(
            NaiveDate::from_ymd_opt(2025, 8, from).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, to).unwrap(),
        )
        .unwrap()
    }

    fn reservation(room_id: RoomId, key: &str) -> Reservation {
        Reservation::confirmed(
            ReservationId::new(),
            ReservationKey::new(SourceType::Alpha, key),
            room_id,
            stay(15, 18),
            Guest::default(),
            Amount::from_minor(100),
            Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn load_days_returns_rows_inside_the_stay_only() {
        let repo = InMemoryLedgerRepository::new();
        let room = RoomId::new();
        let days = stay(14, 20)
            .dates()
            .map(|date| InventoryDay::available(room, date))
            .collect();
        repo.commit(LedgerCommit {
            days,
            ..LedgerCommit::default()
        })
        .await
        .unwrap();

        let loaded = repo.load_days(room, stay(15, 18)).await.unwrap();
        let dates: Vec<_> = loaded.iter().map(|day| day.date).collect();
        assert_eq!(dates, stay(15, 18).dates().collect::<Vec<_>>());
        assert!(repo.load_days(RoomId::new(), stay(15, 18)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_reservation_key_conflicts_and_writes_nothing() {
        let repo = InMemoryLedgerRepository::new();
        let room = RoomId::new();
        let first = reservation(room, "YNJ-1");
        repo.commit(LedgerCommit {
            reservations: vec![first.clone()],
            ..LedgerCommit::default()
        })
        .await
        .unwrap();

        let second = reservation(room, "YNJ-1");
        let err = repo
            .commit(LedgerCommit {
                days: vec![InventoryDay::available(room, stay(15, 16).check_in())],
                reservations: vec![second],
                ..LedgerCommit::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(repo.days_for_room(room).is_empty());
        assert_eq!(repo.reservations(), vec![first]);
    }

    #[tokio::test]
    async fn failing_backend_rejects_every_call() {
        let repo = InMemoryLedgerRepository::new();
        repo.set_failing(true);
        let key = ReservationKey::new(SourceType::Beta, "HM1");
        assert!(repo.find_reservation(&key).await.is_err());
        assert!(repo.commit(LedgerCommit::default()).await.is_err());
        assert!(repo.audit_log().await.is_err());
    }
}
