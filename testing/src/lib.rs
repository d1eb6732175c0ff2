//! # Roomsync Testing
//!
//! Testing utilities and helpers for roomsync.
//!
//! This crate provides:
//! - Mock implementations of Environment traits and external collaborators
//! - Given-When-Then reducer tests ([`ReducerTest`])
//! - Property-based testing strategies for domain types
//!
//! ## Example
//!
//! ```ignore
//! use roomsync_testing::mocks::{InMemoryRoomDirectory, test_clock};
//!
//! #[tokio::test]
//! async fn booking_flow() {
//!     let directory = Arc::new(InMemoryRoomDirectory::new());
//!     let room = directory.provision("Ocean 101", &[(SourceType::Alpha, "R-101")]);
//!     let reconciler = Reconciler::new(directory, repository, Arc::new(test_clock()));
//!     // ...
//! }
//! ```

#![allow(clippy::module_name_repetitions)]


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits and collaborators
pub mod mocks {
    use chrono::{DateTime, Utc};
    use roomsync_core::environment::{Clock, IdGenerator};
    use roomsync_core::ids::{PropertyId, RoomId};
    use roomsync_core::raw_event::{DeliveryHeaders, RawEventStore, RawStoreError};
    use roomsync_core::room::{DirectoryError, Room, RoomDirectory, RoomMapping};
    use roomsync_core::source::SourceType;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Mutex, PoisonError, RwLock};
    use uuid::Uuid;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use roomsync_testing::mocks::FixedClock;
    /// use roomsync_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Predictable id generator: 1, 2, 3, ... as UUIDs
    #[derive(Debug, Default)]
    pub struct SequentialIds {
        next: AtomicU64,
    }

    impl SequentialIds {
        /// Create a generator starting at 1
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }
    }

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> Uuid {
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            Uuid::from_u128(u128::from(n))
        }
    }

    /// A raw body captured by [`InMemoryRawEventStore`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StoredRawEvent {
        /// Body exactly as delivered
        pub raw_body: String,
        /// Headers as delivered
        pub headers: DeliveryHeaders,
    }

    /// Append-only raw store keeping bodies in memory
    #[derive(Debug, Default)]
    pub struct InMemoryRawEventStore {
        records: Mutex<Vec<StoredRawEvent>>,
        failing: AtomicBool,
    }

    impl InMemoryRawEventStore {
        /// Create an empty store
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent `store` call fail
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Everything stored so far, in arrival order
        #[must_use]
        pub fn records(&self) -> Vec<StoredRawEvent> {
            self.records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of stored bodies
        #[must_use]
        pub fn len(&self) -> usize {
            self.records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Whether nothing has been stored
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl RawEventStore for InMemoryRawEventStore {
        fn store<'a>(
            &'a self,
            raw_body: &'a str,
            headers: &'a DeliveryHeaders,
        ) -> Pin<Box<dyn Future<Output = Result<(), RawStoreError>> + Send + 'a>> {
            Box::pin(async move {
                if self.failing.load(Ordering::SeqCst) {
                    return Err(RawStoreError::Unavailable("store offline".to_string()));
                }
                self.records
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(StoredRawEvent {
                        raw_body: raw_body.to_string(),
                        headers: headers.clone(),
                    });
                Ok(())
            })
        }
    }

    /// Room directory backed by in-memory maps
    #[derive(Debug, Default)]
    pub struct InMemoryRoomDirectory {
        rooms: RwLock<HashMap<RoomId, Room>>,
        mappings: RwLock<HashMap<(SourceType, String), RoomMapping>>,
        properties: RwLock<HashMap<(SourceType, String), PropertyId>>,
        unavailable: AtomicBool,
    }

    impl InMemoryRoomDirectory {
        /// Create an empty directory
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a room
        pub fn add_room(&self, room: Room) {
            self.rooms
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(room.id, room);
        }

        /// Map a platform listing onto a room, replacing any previous mapping
        pub fn map_room(&self, source: SourceType, platform_room_id: &str, room_id: RoomId) {
            self.mappings
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(
                    (source, platform_room_id.to_string()),
                    RoomMapping {
                        source,
                        platform_room_id: platform_room_id.to_string(),
                        room_id,
                        active: true,
                    },
                );
        }

        /// Deactivate a mapping; it then resolves as not found
        pub fn deactivate(&self, source: SourceType, platform_room_id: &str) {
            if let Some(mapping) = self
                .mappings
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .get_mut(&(source, platform_room_id.to_string()))
            {
                mapping.active = false;
            }
        }

        /// Map a platform property id onto a property
        pub fn map_property(
            &self,
            source: SourceType,
            platform_property_id: &str,
            property_id: PropertyId,
        ) {
            self.properties
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert((source, platform_property_id.to_string()), property_id);
        }

        /// Create a room and map it under each `(source, platform id)` pair
        pub fn provision(&self, name: &str, listings: &[(SourceType, &str)]) -> Room {
            let room = Room::new(name, PropertyId::new());
            self.add_room(room.clone());
            for (source, platform_room_id) in listings {
                self.map_room(*source, platform_room_id, room.id);
            }
            room
        }

        /// Simulate a backend outage
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        fn check_available(&self) -> Result<(), DirectoryError> {
            if self.unavailable.load(Ordering::SeqCst) {
                Err(DirectoryError::Unavailable("directory offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl RoomDirectory for InMemoryRoomDirectory {
        fn resolve_room<'a>(
            &'a self,
            source: SourceType,
            platform_room_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<Room>, DirectoryError>> + Send + 'a>>
        {
            Box::pin(async move {
                self.check_available()?;
                let room_id = self
                    .mappings
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&(source, platform_room_id.to_string()))
                    .filter(|mapping| mapping.active)
                    .map(|mapping| mapping.room_id);
                Ok(room_id.and_then(|id| {
                    self.rooms
                        .read()
                        .unwrap_or_else(PoisonError::into_inner)
                        .get(&id)
                        .cloned()
                }))
            })
        }

        fn resolve_property<'a>(
            &'a self,
            source: SourceType,
            platform_property_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<PropertyId>, DirectoryError>> + Send + 'a>>
        {
            Box::pin(async move {
                self.check_available()?;
                Ok(self
                    .properties
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&(source, platform_property_id.to_string()))
                    .copied())
            })
        }
    }
}

/// Property-based testing strategies for domain types
pub mod properties {
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;
    use roomsync_core::event::StayRange;

    /// First day covered by generated stays
    #[must_use]
    pub fn horizon_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
    }

    /// Stays of 1..=`max_nights` nights starting within `horizon_days` of the horizon start
    pub fn stay_range(horizon_days: i64, max_nights: i64) -> impl Strategy<Value = StayRange> {
        (0..horizon_days, 1..=max_nights).prop_filter_map("valid stay", |(offset, nights)| {
            let check_in = horizon_start() + Duration::days(offset);
            StayRange::new(check_in, check_in + Duration::days(nights)).ok()
        })
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
