//! Upstream platform simulators.
//!
//! Each platform keeps its own reservation book and issues payloads in its
//! native wire shape, the same shapes the broker's translators decode. The
//! platforms know nothing about delivery; scenarios hand what they issue to
//! the delivery pipeline.

use roomsync_core::environment::Clock;
use roomsync_core::event::StayRange;
use roomsync_core::room::Room;
use roomsync_core::source::SourceType;
use roomsync_testing::mocks::InMemoryRoomDirectory;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Source `A` platform
pub mod alpha;

/// Source `B` platform
pub mod beta;

/// Source `C` platform
pub mod gamma;

pub use alpha::AlphaPlatform;
pub use beta::BetaPlatform;
pub use gamma::GammaPlatform;

/// Errors raised while issuing a payload.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Payload did not serialize
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A payload a platform issued for one lifecycle step.
#[derive(Debug, Clone, PartialEq)]
pub struct Issued {
    /// Issuing platform
    pub source: SourceType,
    /// The platform's own reservation id
    pub reservation_id: String,
    /// Native payload
    pub payload: serde_json::Value,
}

impl Issued {
    fn encode(
        source: SourceType,
        reservation_id: impl Into<String>,
        payload: &impl Serialize,
    ) -> Result<Self, PlatformError> {
        Ok(Self {
            source,
            reservation_id: reservation_id.into(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// A simulated upstream platform.
pub trait PlatformSimulator: Send + Sync {
    /// Which source this platform is
    fn source(&self) -> SourceType;

    /// Book `room` for `guest` and issue the booking payload.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the payload cannot be encoded.
    fn book(&self, room: &str, guest: &str, stay: StayRange) -> Result<Issued, PlatformError>;

    /// Cancel a reservation and issue the cancellation payload.
    ///
    /// Unknown ids still issue a minimal payload naming the id.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the payload cannot be encoded.
    fn cancel(&self, reservation_id: &str) -> Result<Issued, PlatformError>;

    /// Whether the platform still holds the reservation
    fn has_reservation(&self, reservation_id: &str) -> bool;
}

/// Reservations a platform currently holds, keyed by its own id.
#[derive(Debug)]
pub(crate) struct ReservationBook<P> {
    entries: Mutex<HashMap<String, P>>,
}

impl<P> Default for ReservationBook<P> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<P> ReservationBook<P> {
    pub(crate) fn store(&self, id: impl Into<String>, payload: P) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), payload);
    }

    pub(crate) fn take(&self, id: &str) -> Option<P> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }
}

/// `prefix` followed by eight uppercase hex characters.
#[must_use]
pub fn prefixed_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{prefix}{}", &simple[..8])
}

/// One simulator per source, sharing a clock.
#[derive(Clone)]
pub struct Platforms {
    /// Source `A`
    pub alpha: Arc<AlphaPlatform>,
    /// Source `B`
    pub beta: Arc<BetaPlatform>,
    /// Source `C`
    pub gamma: Arc<GammaPlatform>,
}

impl Platforms {
    /// Create all three platforms
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            alpha: Arc::new(AlphaPlatform::new(Arc::clone(&clock))),
            beta: Arc::new(BetaPlatform::new(Arc::clone(&clock))),
            gamma: Arc::new(GammaPlatform::new(clock)),
        }
    }

    /// The platform for a source
    #[must_use]
    pub fn get(&self, source: SourceType) -> &dyn PlatformSimulator {
        match source {
            SourceType::Alpha => self.alpha.as_ref(),
            SourceType::Beta => self.beta.as_ref(),
            SourceType::Gamma => self.gamma.as_ref(),
        }
    }
}

/// Register `room_code` in the directory under every platform's listing id.
///
/// Source `C` also gets its accommodation id mapped onto the room's property.
pub fn provision_room(directory: &InMemoryRoomDirectory, room_code: &str) -> Room {
    let (alpha_listing, beta_listing, gamma_room_type) = (
        alpha::listing_id(room_code),
        beta::listing_id(room_code),
        gamma::room_type_id(room_code),
    );
    let room = directory.provision(
        room_code,
        &[
            (SourceType::Alpha, alpha_listing.as_str()),
            (SourceType::Beta, beta_listing.as_str()),
            (SourceType::Gamma, gamma_room_type.as_str()),
        ],
    );
    directory.map_property(
        SourceType::Gamma,
        &gamma::accommodation_id(room_code),
        room.property_id,
    );
    room
}
