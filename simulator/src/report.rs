//! Execution reports.
//!
//! One entry per send attempt. A dropped delivery still gets an entry, marked
//! undelivered; each duplicate copy gets its own entry tagged
//! [`DUPLICATE_TAG`].

use chrono::{DateTime, Utc};
use roomsync_core::source::{EventKind, SourceType};
use serde::Serialize;
use std::fmt;

/// Chaos tag of every copy after the first
pub const DUPLICATE_TAG: &str = "DUP_COPY";

/// Chaos tag of an undisturbed delivery
pub const CLEAN_TAG: &str = "CLEAN";

const ID_WIDTH: usize = 14;

/// One send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    /// Emitting platform
    pub source: SourceType,
    /// Lifecycle step
    pub kind: EventKind,
    /// Delivery id
    pub event_id: String,
    /// The platform's reservation id
    pub reservation_id: String,
    /// Chaos applied, [`CLEAN_TAG`] or [`DUPLICATE_TAG`] included
    pub chaos: String,
    /// Whether the broker accepted it
    pub delivered: bool,
}

impl ReportEntry {
    /// Whether any chaos touched this attempt
    #[must_use]
    pub fn is_chaotic(&self) -> bool {
        self.chaos != CLEAN_TAG
    }
}

/// Totals over a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportSummary {
    /// Send attempts
    pub total: usize,
    /// Accepted by the broker
    pub delivered: usize,
    /// Dropped, rejected or failed
    pub failed: usize,
    /// Touched by chaos
    pub chaotic: usize,
}

/// Everything one scenario run sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    correlation_id: String,
    entries: Vec<ReportEntry>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl ExecutionReport {
    /// Empty report for one run
    #[must_use]
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            entries: Vec::new(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Run correlation id
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Entries in send order
    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Append an entry
    pub fn record(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    /// Stamp the start time
    pub fn mark_start(&mut self, at: DateTime<Utc>) {
        self.started_at = Some(at);
    }

    /// Stamp the end time
    pub fn mark_end(&mut self, at: DateTime<Utc>) {
        self.ended_at = Some(at);
    }

    /// Elapsed milliseconds, zero until both ends are stamped
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds(),
            _ => 0,
        }
    }

    /// Totals
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let delivered = self.entries.iter().filter(|e| e.delivered).count();
        ReportSummary {
            total: self.entries.len(),
            delivered,
            failed: self.entries.len() - delivered,
            chaotic: self.entries.iter().filter(|e| e.is_chaotic()).count(),
        }
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let kept: String = value.chars().take(width.saturating_sub(2)).collect();
        format!("{kept}..")
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "correlation={} duration={}ms",
            self.correlation_id,
            self.duration_ms()
        )?;
        writeln!(
            f,
            "  {:<6} {:<12} {:<w$} {:<w$} {:<24} {}",
            "SOURCE",
            "KIND",
            "EVENT",
            "RESERVATION",
            "CHAOS",
            "DELIVERED",
            w = ID_WIDTH
        )?;
        for entry in &self.entries {
            writeln!(
                f,
                "  {:<6} {:<12} {:<w$} {:<w$} {:<24} {}",
                entry.source.code(),
                entry.kind.as_str(),
                truncate(&entry.event_id, ID_WIDTH),
                truncate(&entry.reservation_id, ID_WIDTH),
                entry.chaos,
                if entry.delivered { "yes" } else { "NO" },
                w = ID_WIDTH
            )?;
        }
        let summary = self.summary();
        write!(
            f,
            "  TOTAL={} DELIVERED={} FAILED={} CHAOTIC={}",
            summary.total, summary.delivered, summary.failed, summary.chaotic
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(chaos: &str, delivered: bool) -> ReportEntry {
        ReportEntry {
            source: SourceType::Alpha,
            kind: EventKind::Booking,
            event_id: "0190f3a2-7c1e-7000-8000-000000000001".to_string(),
            reservation_id: "YNJ-1A2B3C4D".to_string(),
            chaos: chaos.to_string(),
            delivered,
        }
    }

    #[test]
    fn summary_counts_delivered_failed_and_chaotic() {
        let mut report = ExecutionReport::new("run-1");
        report.record(entry(CLEAN_TAG, true));
        report.record(entry("DUP(x1)", true));
        report.record(entry(DUPLICATE_TAG, true));
        report.record(entry("FAIL", false));

        assert_eq!(
            report.summary(),
            ReportSummary {
                total: 4,
                delivered: 3,
                failed: 1,
                chaotic: 3,
            }
        );
    }

    #[test]
    fn duration_needs_both_stamps() {
        let start = Utc::now();
        let mut report = ExecutionReport::new("run-1");
        assert_eq!(report.duration_ms(), 0);

        report.mark_start(start);
        report.mark_end(start + Duration::milliseconds(1500));
        assert_eq!(report.duration_ms(), 1500);
    }

    #[test]
    fn printed_report_truncates_long_ids() {
        let mut report = ExecutionReport::new("run-1");
        report.record(entry(CLEAN_TAG, true));
        let printed = report.to_string();

        assert!(printed.contains("0190f3a2-7c1.."));
        assert!(printed.contains("YNJ-1A2B3C4D"));
        assert!(printed.ends_with("TOTAL=1 DELIVERED=1 FAILED=0 CHAOTIC=0"));
    }

    #[test]
    fn truncate_is_char_aware() {
        assert_eq!(truncate("예약완료예약완료", 4), "예약..");
        assert_eq!(truncate("short", 10), "short");
    }
}
