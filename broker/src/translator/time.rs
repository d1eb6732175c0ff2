//! Date and timestamp parsing shared by the source translators.
//!
//! Blank strings count as absent. Every parser reports the offending field so
//! translation errors point at the payload key that broke.

use super::TranslationCause;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// `yyyy-MM-dd`
pub const ISO_DATE: &str = "%Y-%m-%d";

/// `yyyyMMdd`
pub const COMPACT_DATE: &str = "%Y%m%d";

/// `yyyy-MM-ddTHH:mm:ss`
pub const LOCAL_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Seconds east of UTC for sources reporting wall-clock time at +09:00
pub const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Trimmed value, or `None` when missing or blank
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Owned variant of [`non_blank`]
pub fn non_blank_owned(value: Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(ToOwned::to_owned)
}

/// Parse an optional date with the given `format`.
///
/// # Errors
///
/// Returns [`TranslationCause::InvalidDate`] if a non-blank value does not match.
pub fn parse_date(
    field: &'static str,
    value: Option<&str>,
    format: &str,
) -> Result<Option<NaiveDate>, TranslationCause> {
    non_blank(value)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, format).map_err(|_| TranslationCause::InvalidDate {
                field,
                value: raw.to_string(),
            })
        })
        .transpose()
}

/// Parse an optional offset-less local timestamp observed at `offset_secs` east of UTC.
///
/// # Errors
///
/// Returns [`TranslationCause::InvalidTimestamp`] if a non-blank value does not match.
pub fn parse_local_date_time(
    field: &'static str,
    value: Option<&str>,
    offset_secs: i32,
) -> Result<Option<DateTime<Utc>>, TranslationCause> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    let invalid = || TranslationCause::InvalidTimestamp {
        field,
        value: raw.to_string(),
    };
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(invalid)?;
    let local = NaiveDateTime::parse_from_str(raw, LOCAL_DATE_TIME).map_err(|_| invalid())?;
    offset
        .from_local_datetime(&local)
        .single()
        .map(|at| Some(at.with_timezone(&Utc)))
        .ok_or_else(invalid)
}

/// Convert optional epoch milliseconds.
///
/// # Errors
///
/// Returns [`TranslationCause::InvalidTimestamp`] if the value is out of range.
pub fn from_epoch_millis(
    field: &'static str,
    value: Option<i64>,
) -> Result<Option<DateTime<Utc>>, TranslationCause> {
    value
        .map(|millis| {
            DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                TranslationCause::InvalidTimestamp {
                    field,
                    value: millis.to_string(),
                }
            })
        })
        .transpose()
}

/// Convert optional epoch seconds.
///
/// # Errors
///
/// Returns [`TranslationCause::InvalidTimestamp`] if the value is out of range.
pub fn from_epoch_seconds(
    field: &'static str,
    value: Option<i64>,
) -> Result<Option<DateTime<Utc>>, TranslationCause> {
    value
        .map(|secs| {
            DateTime::from_timestamp(secs, 0).ok_or_else(|| TranslationCause::InvalidTimestamp {
                field,
                value: secs.to_string(),
            })
        })
        .transpose()
}
