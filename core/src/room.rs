//! Rooms, properties and platform mappings.
//!
//! Each source names rooms and properties in its own namespace. The
//! [`RoomDirectory`] maps those platform ids to internal identities. Mappings
//! are provisioned by an external process; roomsync only reads them.

use crate::ids::{PropertyId, RoomId};
use crate::source::SourceType;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Operational status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Open for sale
    #[default]
    Active,
    /// Withdrawn from sale
    Inactive,
    /// Temporarily out of service
    Maintenance,
}

/// An internal room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Internal identifier
    pub id: RoomId,
    /// Display name
    pub name: String,
    /// Owning property
    pub property_id: PropertyId,
    /// Operational status
    pub status: RoomStatus,
}

impl Room {
    /// Creates an active room
    #[must_use]
    pub fn new(name: impl Into<String>, property_id: PropertyId) -> Self {
        Self {
            id: RoomId::new(),
            name: name.into(),
            property_id,
            status: RoomStatus::Active,
        }
    }
}

/// Association of a platform listing with an internal room.
///
/// Unique per `(source, platform_room_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMapping {
    /// Upstream source
    pub source: SourceType,
    /// Room (listing) id in the source's namespace
    pub platform_room_id: String,
    /// Internal room
    pub room_id: RoomId,
    /// Inactive mappings resolve as not found
    pub active: bool,
}

/// Association of a platform property id with an internal property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMapping {
    /// Upstream source
    pub source: SourceType,
    /// Property id in the source's namespace
    pub platform_property_id: String,
    /// Internal property
    pub property_id: PropertyId,
}

/// Errors from the room directory backend.
#[derive(Error, Debug, Clone)]
pub enum DirectoryError {
    /// Backend could not be reached.
    #[error("Room directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup from platform identifiers to internal rooms and properties.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so the directory can be held
/// as `Arc<dyn RoomDirectory>` inside the reconciler.
pub trait RoomDirectory: Send + Sync {
    /// Resolve an active room mapping.
    ///
    /// Returns `Ok(None)` when no active mapping exists.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the backend fails.
    fn resolve_room<'a>(
        &'a self,
        source: SourceType,
        platform_room_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Room>, DirectoryError>> + Send + 'a>>;

    /// Resolve a platform property id.
    ///
    /// Returns `Ok(None)` when the property is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the backend fails.
    fn resolve_property<'a>(
        &'a self,
        source: SourceType,
        platform_property_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PropertyId>, DirectoryError>> + Send + 'a>>;
}
