//! Room ledger: inventory reducer for one room.
//!
//! The reconciler loads the rows a command touches into a [`RoomLedger`],
//! runs the command through [`LedgerReducer`], and persists whatever the
//! ledger reports as changed. Commands are validated first; on success they
//! are turned into an event and applied, on failure the ledger records an
//! outcome and nothing changes.
//!
//! The reducer never performs I/O and never returns effects.

use chrono::{DateTime, NaiveDate, Utc};
use roomsync_core::effect::Effect;
use roomsync_core::environment::{Clock, IdGenerator};
use roomsync_core::event::{Amount, Guest, StayRange};
use roomsync_core::ids::{ReservationId, RoomId};
use roomsync_core::inventory::{InventoryDay, InventoryStatus};
use roomsync_core::reducer::Reducer;
use roomsync_core::reservation::{Reservation, ReservationKey, ReservationStatus};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ============================================================================
// State
// ============================================================================

/// Loaded slice of one room's ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomLedger {
    room_id: RoomId,
    days: BTreeMap<NaiveDate, InventoryDay>,
    reservation: Option<Reservation>,
    changed_days: BTreeSet<NaiveDate>,
    reservation_changed: bool,
    /// Outcome of the last command
    pub outcome: Option<LedgerOutcome>,
}

/// Rows a reduction changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerChanges {
    /// Changed inventory rows
    pub days: Vec<InventoryDay>,
    /// Changed reservation
    pub reservation: Option<Reservation>,
}

impl RoomLedger {
    /// Ledger with no stored rows and no reservation
    #[must_use]
    pub fn empty(room_id: RoomId) -> Self {
        Self::load(room_id, Vec::new(), None)
    }

    /// Ledger over the given rows and optional reservation
    #[must_use]
    pub fn load(
        room_id: RoomId,
        days: impl IntoIterator<Item = InventoryDay>,
        reservation: Option<Reservation>,
    ) -> Self {
        Self {
            room_id,
            days: days
                .into_iter()
                .filter(|day| day.room_id == room_id)
                .map(|day| (day.date, day))
                .collect(),
            reservation,
            changed_days: BTreeSet::new(),
            reservation_changed: false,
            outcome: None,
        }
    }

    /// Room this ledger belongs to
    #[must_use]
    pub const fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Status of a date; dates without a row are available
    #[must_use]
    pub fn status_on(&self, date: NaiveDate) -> InventoryStatus {
        self.days
            .get(&date)
            .map_or(InventoryStatus::Available, |day| day.status)
    }

    /// Stored row for a date
    #[must_use]
    pub fn day(&self, date: NaiveDate) -> Option<&InventoryDay> {
        self.days.get(&date)
    }

    /// Loaded reservation
    #[must_use]
    pub const fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    /// Dates inside `stay` that are not available
    #[must_use]
    pub fn unavailable_dates(&self, stay: StayRange) -> Vec<NaiveDate> {
        stay.dates()
            .filter(|date| self.status_on(*date) != InventoryStatus::Available)
            .collect()
    }

    /// Dates inside `stay` booked by any reservation
    #[must_use]
    pub fn booked_dates(&self, stay: StayRange) -> Vec<NaiveDate> {
        stay.dates()
            .filter(|date| self.status_on(*date) == InventoryStatus::Booked)
            .collect()
    }

    /// Everything changed since load
    #[must_use]
    pub fn changes(&self) -> LedgerChanges {
        LedgerChanges {
            days: self
                .changed_days
                .iter()
                .filter_map(|date| self.days.get(date).cloned())
                .collect(),
            reservation: if self.reservation_changed {
                self.reservation.clone()
            } else {
                None
            },
        }
    }

    /// Whether anything changed since load
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.reservation_changed || !self.changed_days.is_empty()
    }

    fn day_mut(&mut self, date: NaiveDate) -> &mut InventoryDay {
        self.changed_days.insert(date);
        let room_id = self.room_id;
        self.days
            .entry(date)
            .or_insert_with(|| InventoryDay::available(room_id, date))
    }
}

/// Result of the last command applied to a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// A reservation was created and its nights booked
    Booked(ReservationId),
    /// A reservation was cancelled and its nights released
    Cancelled(ReservationId),
    /// Nothing to cancel
    CancellationIgnored,
    /// The command had already taken effect
    AlreadyApplied(ReservationId),
    /// Dates were blocked
    Blocked {
        /// Number of nights blocked
        nights: usize,
    },
    /// Blocked dates were released
    Released {
        /// Number of nights released
        nights: usize,
    },
    /// A reservation reached a terminal status
    Closed {
        /// The reservation
        reservation_id: ReservationId,
        /// Its new status
        status: ReservationStatus,
    },
    /// At least one requested date is not available
    Unavailable(Vec<NaiveDate>),
    /// The command is not valid for the loaded state
    Invalid(String),
}

// ============================================================================
// Actions
// ============================================================================

/// Commands and events of the room ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerAction {
    // ===== Commands =====
    /// Book every night of a stay for a new reservation
    BookStay {
        /// Dedup key
        key: ReservationKey,
        /// Nights to book
        stay: StayRange,
        /// Guest details
        guest: Guest,
        /// Reported total
        total_amount: Amount,
        /// When the source booked it
        booked_at: DateTime<Utc>,
    },

    /// Cancel the loaded reservation and release its nights
    CancelReservation {
        /// Dedup key
        key: ReservationKey,
    },

    /// Take available dates out of sale
    BlockDates {
        /// Nights to block
        stay: StayRange,
        /// Why
        reason: String,
    },

    /// Return blocked dates to sale
    ReleaseBlock {
        /// Nights to release
        stay: StayRange,
    },

    /// Mark the loaded reservation completed
    CompleteReservation {
        /// Dedup key
        key: ReservationKey,
    },

    /// Mark the loaded reservation a no-show
    MarkNoShow {
        /// Dedup key
        key: ReservationKey,
    },

    // ===== Events =====
    /// A reservation was created
    StayBooked {
        /// The new reservation
        reservation: Reservation,
    },

    /// A reservation was cancelled
    ReservationCancelled {
        /// The reservation
        reservation_id: ReservationId,
        /// When
        cancelled_at: DateTime<Utc>,
    },

    /// Dates were blocked
    DatesBlocked {
        /// Blocked nights
        stay: StayRange,
        /// Why
        reason: String,
    },

    /// Blocked dates were released
    BlockReleased {
        /// Released dates
        dates: Vec<NaiveDate>,
    },

    /// A reservation reached a terminal status other than cancelled
    ReservationClosed {
        /// The reservation
        reservation_id: ReservationId,
        /// Completed or no-show
        status: ReservationStatus,
    },

    /// Some requested dates are taken
    DatesUnavailable {
        /// Taken dates
        dates: Vec<NaiveDate>,
    },

    /// The command already took effect
    AlreadyApplied {
        /// The reservation it applied to
        reservation_id: ReservationId,
    },

    /// Cancellation of a reservation that does not exist
    CancellationIgnored {
        /// Dedup key
        key: ReservationKey,
    },

    /// Command rejected
    ValidationFailed {
        /// Reason
        error: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the ledger reducer.
#[derive(Clone)]
pub struct LedgerEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Reservation id source
    pub ids: Arc<dyn IdGenerator>,
}

impl LedgerEnvironment {
    /// Creates a new `LedgerEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { clock, ids }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for [`RoomLedger`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerReducer;

impl LedgerReducer {
    /// Creates a new `LedgerReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn loaded<'a>(state: &'a RoomLedger, key: &ReservationKey) -> Option<&'a Reservation> {
        state.reservation.as_ref().filter(|r| &r.key == key)
    }

    fn validate_block(state: &RoomLedger, stay: StayRange) -> Result<(), Vec<NaiveDate>> {
        let taken = state.unavailable_dates(stay);
        if taken.is_empty() { Ok(()) } else { Err(taken) }
    }

    fn validate_close(state: &RoomLedger, key: &ReservationKey) -> Result<ReservationId, String> {
        let reservation =
            Self::loaded(state, key).ok_or_else(|| format!("reservation {key} not found"))?;
        if reservation.status.is_terminal() {
            return Err(format!("reservation {key} is already {}", reservation.status));
        }
        Ok(reservation.id)
    }

    /// Decide the event a command produces against the loaded state
    fn decide(state: &RoomLedger, action: LedgerAction, env: &LedgerEnvironment) -> LedgerAction {
        match action {
            LedgerAction::BookStay {
                key,
                stay,
                guest,
                total_amount,
                booked_at,
            } => {
                if let Some(existing) = Self::loaded(state, &key) {
                    return LedgerAction::AlreadyApplied {
                        reservation_id: existing.id,
                    };
                }
                if let Err(dates) = Self::validate_block(state, stay) {
                    return LedgerAction::DatesUnavailable { dates };
                }
                LedgerAction::StayBooked {
                    reservation: Reservation::confirmed(
                        ReservationId::from_uuid(env.ids.next_id()),
                        key,
                        state.room_id,
                        stay,
                        guest,
                        total_amount,
                        booked_at,
                    ),
                }
            },
            LedgerAction::CancelReservation { key } => match Self::loaded(state, &key) {
                None => LedgerAction::CancellationIgnored { key },
                Some(reservation) if reservation.status.is_terminal() => {
                    LedgerAction::AlreadyApplied {
                        reservation_id: reservation.id,
                    }
                },
                Some(reservation) => LedgerAction::ReservationCancelled {
                    reservation_id: reservation.id,
                    cancelled_at: env.clock.now(),
                },
            },
            LedgerAction::BlockDates { stay, reason } => match Self::validate_block(state, stay) {
                Ok(()) => LedgerAction::DatesBlocked { stay, reason },
                Err(dates) => LedgerAction::DatesUnavailable { dates },
            },
            LedgerAction::ReleaseBlock { stay } => LedgerAction::BlockReleased {
                dates: stay
                    .dates()
                    .filter(|date| state.status_on(*date) == InventoryStatus::Blocked)
                    .collect(),
            },
            LedgerAction::CompleteReservation { key } => match Self::validate_close(state, &key) {
                Ok(reservation_id) => LedgerAction::ReservationClosed {
                    reservation_id,
                    status: ReservationStatus::Completed,
                },
                Err(error) => LedgerAction::ValidationFailed { error },
            },
            LedgerAction::MarkNoShow { key } => match Self::validate_close(state, &key) {
                Ok(reservation_id) => LedgerAction::ReservationClosed {
                    reservation_id,
                    status: ReservationStatus::NoShow,
                },
                Err(error) => LedgerAction::ValidationFailed { error },
            },
            event => event,
        }
    }

    /// Apply a decided event to state.
    ///
    /// Events are re-checked against the loaded days: a night that is no
    /// longer available turns the event into [`LedgerOutcome::Unavailable`]
    /// and leaves the ledger untouched.
    fn apply_event(state: &mut RoomLedger, action: &LedgerAction) {
        match action {
            LedgerAction::StayBooked { reservation } => {
                let taken = state.unavailable_dates(reservation.stay);
                if !taken.is_empty() {
                    state.outcome = Some(LedgerOutcome::Unavailable(taken));
                    return;
                }
                for date in reservation.stay.dates() {
                    if let Err(e) = state.day_mut(date).book(reservation.id) {
                        state.outcome = Some(LedgerOutcome::Invalid(e.to_string()));
                        return;
                    }
                }
                state.reservation = Some(reservation.clone());
                state.reservation_changed = true;
                state.outcome = Some(LedgerOutcome::Booked(reservation.id));
            },
            LedgerAction::ReservationCancelled {
                reservation_id,
                cancelled_at,
            } => {
                let Some(reservation) = state
                    .reservation
                    .as_mut()
                    .filter(|r| r.id == *reservation_id)
                else {
                    state.outcome = Some(LedgerOutcome::CancellationIgnored);
                    return;
                };
                if reservation.cancel(*cancelled_at).is_err() {
                    state.outcome = Some(LedgerOutcome::AlreadyApplied(*reservation_id));
                    return;
                }
                let stay = reservation.stay;
                state.reservation_changed = true;
                for date in stay.dates() {
                    let linked = state
                        .days
                        .get(&date)
                        .is_some_and(|day| day.reservation_id == Some(*reservation_id));
                    if linked {
                        state.day_mut(date).release();
                    }
                }
                state.outcome = Some(LedgerOutcome::Cancelled(*reservation_id));
            },
            LedgerAction::DatesBlocked { stay, reason } => {
                let taken = state.unavailable_dates(*stay);
                if !taken.is_empty() {
                    state.outcome = Some(LedgerOutcome::Unavailable(taken));
                    return;
                }
                for date in stay.dates() {
                    if let Err(e) = state.day_mut(date).block(reason.clone()) {
                        state.outcome = Some(LedgerOutcome::Invalid(e.to_string()));
                        return;
                    }
                }
                state.outcome = Some(LedgerOutcome::Blocked {
                    nights: stay.dates().count(),
                });
            },
            LedgerAction::BlockReleased { dates } => {
                for date in dates {
                    state.day_mut(*date).release();
                }
                state.outcome = Some(LedgerOutcome::Released {
                    nights: dates.len(),
                });
            },
            LedgerAction::ReservationClosed {
                reservation_id,
                status,
            } => {
                if let Some(reservation) = state
                    .reservation
                    .as_mut()
                    .filter(|r| r.id == *reservation_id)
                {
                    let closed = match status {
                        ReservationStatus::NoShow => reservation.mark_no_show(),
                        _ => reservation.complete(),
                    };
                    if closed.is_ok() {
                        state.reservation_changed = true;
                    }
                }
                state.outcome = Some(LedgerOutcome::Closed {
                    reservation_id: *reservation_id,
                    status: *status,
                });
            },
            LedgerAction::DatesUnavailable { dates } => {
                state.outcome = Some(LedgerOutcome::Unavailable(dates.clone()));
            },
            LedgerAction::AlreadyApplied { reservation_id } => {
                state.outcome = Some(LedgerOutcome::AlreadyApplied(*reservation_id));
            },
            LedgerAction::CancellationIgnored { .. } => {
                state.outcome = Some(LedgerOutcome::CancellationIgnored);
            },
            LedgerAction::ValidationFailed { error } => {
                state.outcome = Some(LedgerOutcome::Invalid(error.clone()));
            },
            // Commands are not events
            LedgerAction::BookStay { .. }
            | LedgerAction::CancelReservation { .. }
            | LedgerAction::BlockDates { .. }
            | LedgerAction::ReleaseBlock { .. }
            | LedgerAction::CompleteReservation { .. }
            | LedgerAction::MarkNoShow { .. } => {},
        }
    }
}

impl Reducer for LedgerReducer {
    type State = RoomLedger;
    type Action = LedgerAction;
    type Environment = LedgerEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let event = Self::decide(state, action, env);
        Self::apply_event(state, &event);
        SmallVec::new()
    }
}
