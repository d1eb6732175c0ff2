//! # Roomsync Core
//!
//! Core traits and domain types shared by the roomsync broker and simulator.
//!
//! Reservation events arrive from three heterogeneous upstream sources. Each is
//! translated into a [`event::CanonicalEvent`] and reconciled against a shared
//! per-room inventory. This crate holds the vocabulary every stage agrees on.
//!
//! ## Core Concepts
//!
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits ([`environment::Clock`],
//!   [`environment::IdGenerator`])
//! - **Canonical event**: the normalized, source-agnostic reservation event
//! - **Inventory day**: per-room, per-date availability record; a missing row
//!   means the date is available
//!
//! ## Collaborators
//!
//! Everything outside the reconciliation path is reached through a trait so
//! that production backends and in-memory test doubles are interchangeable:
//!
//! - [`raw_event::RawEventStore`]: append-only raw body store
//! - [`room::RoomDirectory`]: platform listing → room lookup
//! - [`failed_event::FailedEventStore`]: queue of events that could not be routed
//!
//! ## Example
//!
//! ```
//! use roomsync_core::source::{EventKind, SourceType};
//!
//! assert_eq!(SourceType::from_alias("airbnb"), Some(SourceType::Beta));
//! assert_eq!(EventKind::from_alias(Some("cancel")), EventKind::Cancellation);
//! assert_eq!(EventKind::from_alias(None), EventKind::Booking);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Audit trail records for every reconciled event
pub mod audit;

/// Canonical event model
pub mod event;

/// Failed-event records and their store contract
pub mod failed_event;

/// Typed identifiers
pub mod ids;

/// Per-room, per-date inventory records
pub mod inventory;

/// Raw delivery storage contract and delivery headers
pub mod raw_event;

/// Reservations and their lifecycle
pub mod reservation;

/// Rooms, properties and platform mappings
pub mod room;

/// Upstream source identifiers and event kinds
pub mod source;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for LedgerReducer {
    ///     type State = RoomLedger;
    ///     type Action = LedgerAction;
    ///     type Environment = LedgerEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut RoomLedger,
    ///         action: LedgerAction,
    ///         env: &LedgerEnvironment,
    ///     ) -> SmallVec<[Effect<LedgerAction>; 4]> {
    ///         match action {
    ///             LedgerAction::BookStay { .. } => {
    ///                 // Business logic here
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Apply `action` to `state` in place.
        ///
        /// Must not perform I/O; anything that has to happen outside the
        /// state is returned as an [`Effect`] for the caller to execute.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers or planners and executed by the runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries, injected latency)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Action dispatched immediately
        Dispatch(Box<Action>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back to the caller
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Dispatch(action) => {
                    f.debug_tuple("Effect::Dispatch").field(action).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Number of actions this effect will dispatch once executed
        ///
        /// `Future` effects are counted as one, since they may or may not
        /// produce an action.
        #[must_use]
        pub fn dispatch_count(&self) -> usize {
            match self {
                Effect::None => 0,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().map(Effect::dispatch_count).sum()
                },
                Effect::Delay { .. } | Effect::Dispatch(_) | Effect::Future(_) => 1,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use roomsync_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Id generator - abstracts identifier minting for testability
    pub trait IdGenerator: Send + Sync {
        /// Mint a fresh identifier
        fn next_id(&self) -> Uuid;
    }

    /// Production id generator producing random v4 UUIDs
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomIds;

    impl IdGenerator for RandomIds {
        fn next_id(&self) -> Uuid {
            Uuid::new_v4()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use std::time::Duration;

    #[test]
    fn dispatch_count_walks_nested_effects() {
        let effect: Effect<u8> = Effect::chain(vec![
            Effect::Delay {
                duration: Duration::from_millis(5),
                action: Box::new(1),
            },
            Effect::merge(vec![
                Effect::Dispatch(Box::new(2)),
                Effect::Dispatch(Box::new(3)),
            ]),
            Effect::None,
        ]);

        assert_eq!(effect.dispatch_count(), 3);
    }

    #[test]
    fn debug_hides_future_body() {
        let effect: Effect<u8> = Effect::Future(Box::pin(async { Some(1) }));
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }
}
