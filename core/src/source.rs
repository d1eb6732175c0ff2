//! Upstream source identifiers and event kinds.
//!
//! Every delivery names its source in a header. Sources are known by a short
//! code (`A`, `B`, `C`) and by a long platform name; both are accepted, case
//! insensitively. Anything else is a routing failure, never a panic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of upstream reservation sources.
///
/// - `Alpha` sends local-script status strings and zoned local timestamps.
/// - `Beta` sends English status enums, split guest names and epoch millis.
/// - `Gamma` sends numeric status codes, compact dates and epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Source with code `A`
    Alpha,
    /// Source with code `B`
    Beta,
    /// Source with code `C`
    Gamma,
}

impl SourceType {
    /// All sources, in code order.
    pub const ALL: [Self; 3] = [Self::Alpha, Self::Beta, Self::Gamma];

    /// Short code sent in the source header.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Alpha => "A",
            Self::Beta => "B",
            Self::Gamma => "C",
        }
    }

    /// Long platform name accepted as an alias of [`Self::code`].
    #[must_use]
    pub const fn platform_name(self) -> &'static str {
        match self {
            Self::Alpha => "YANOLJA",
            Self::Beta => "AIRBNB",
            Self::Gamma => "YEOGIEOTTAE",
        }
    }

    /// Stable name used in logs, metrics and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "ALPHA",
            Self::Beta => "BETA",
            Self::Gamma => "GAMMA",
        }
    }

    /// Resolve a header value to a source.
    ///
    /// Matches short codes and platform names after trimming and uppercasing.
    /// Returns `None` for anything unrecognized.
    #[must_use]
    pub fn from_alias(alias: &str) -> Option<Self> {
        let normalized = alias.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|source| {
            normalized == source.code() || normalized == source.platform_name()
        })
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event kind carried by a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A new reservation
    #[default]
    Booking,
    /// Cancellation of an existing reservation
    Cancellation,
}

impl EventKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "BOOKING",
            Self::Cancellation => "CANCELLATION",
        }
    }

    /// Resolve an optional header value.
    ///
    /// `CANCEL` and `CANCELLATION` map to [`EventKind::Cancellation`];
    /// everything else, including a missing header, is a booking.
    #[must_use]
    pub fn from_alias(alias: Option<&str>) -> Self {
        match alias.map(|value| value.trim().to_ascii_uppercase()).as_deref() {
            Some("CANCEL" | "CANCELLATION") => Self::Cancellation,
            _ => Self::Booking,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
