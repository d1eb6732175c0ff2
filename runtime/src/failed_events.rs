//! Bounded in-memory failed-event queue.
//!
//! Stores deliveries the ingestion router could not route or translate so an
//! external scheduler can inspect and replay them.
//!
//! # Features
//!
//! - Bounded queue with configurable max size
//! - FIFO ordering; when full the oldest entry is evicted, returned from
//!   [`FailedEventQueue::push`] and counted in [`FailedEventQueue::dropped_count`]
//! - Thread-safe for concurrent access
//! - Metrics tracking for queue size and operations
//!
//! # Example
//!
//! ```ignore
//! use roomsync_runtime::FailedEventQueue;
//!
//! let queue = FailedEventQueue::new(1000);
//! queue.push(failed_event);
//!
//! for entry in queue.drain() {
//!     println!("Replay: {}", entry.event_id);
//! }
//! ```
//!
//! An evicted entry is gone from the queue only. Its body is still in the
//! raw-event store under the same event id, so it can be replayed from there.

use roomsync_core::failed_event::{FailedEvent, FailedEventStore, FailedEventStoreError};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Bounded FIFO of failed events.
///
/// Capacity is enforced by eviction, not by refusing new entries: the newest
/// failure is always kept and the oldest one makes room for it.
#[derive(Debug)]
pub struct FailedEventQueue {
    queue: Arc<Mutex<VecDeque<FailedEvent>>>,
    max_size: usize,
    dropped: Arc<AtomicU64>,
}

impl FailedEventQueue {
    /// Create a new queue holding at most `max_size` entries
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            max_size,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Push a failed event onto the queue.
    ///
    /// If the queue is full, the oldest entry is evicted and returned. Each
    /// eviction bumps [`dropped_count`](Self::dropped_count), the
    /// `roomsync_failed_events_dropped_total` counter and logs a warning.
    pub fn push(&self, event: FailedEvent) -> Option<FailedEvent> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);

        let evicted = if queue.len() >= self.max_size {
            queue.pop_front()
        } else {
            None
        };
        if let Some(dropped) = &evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("roomsync_failed_events_dropped_total").increment(1);
            tracing::warn!(
                max_size = self.max_size,
                event_id = %dropped.event_id,
                "Failed-event queue at capacity, dropping oldest entry"
            );
        }

        tracing::warn!(
            event_id = %event.event_id,
            kind = %event.error_kind,
            error = %event.error_message,
            queue_size = queue.len() + 1,
            "Delivery added to failed-event queue"
        );
        metrics::counter!("roomsync_failed_events_total", "kind" => event.error_kind.as_str())
            .increment(1);
        queue.push_back(event);

        // Queue size is bounded by max_size; f64 represents it exactly
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("roomsync_failed_events_pending").set(queue.len() as f64);
        evicted
    }

    /// Entries evicted since the queue was created
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Get the current queue size
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain all entries from the queue
    pub fn drain(&self) -> Vec<FailedEvent> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let entries: Vec<_> = queue.drain(..).collect();

        metrics::gauge!("roomsync_failed_events_pending").set(0.0);
        tracing::info!(count = entries.len(), "Drained failed-event queue");

        entries
    }

    /// Peek at the oldest entry without removing it
    #[must_use]
    pub fn peek(&self) -> Option<FailedEvent> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .front()
            .cloned()
    }

    /// Snapshot of every entry, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<FailedEvent> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Record a replay attempt for every entry with the given event id.
    ///
    /// Returns `true` if any entry matched.
    pub fn record_retry(&self, event_id: &str) -> bool {
        self.update(event_id, FailedEvent::increment_retry_count)
    }

    /// Mark every entry with the given event id as resolved.
    ///
    /// Returns `true` if any entry matched.
    pub fn resolve(&self, event_id: &str) -> bool {
        self.update(event_id, FailedEvent::resolve)
    }

    /// Get the maximum queue size
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    fn update(&self, event_id: &str, apply: impl Fn(&mut FailedEvent)) -> bool {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let mut matched = false;
        for entry in queue.iter_mut().filter(|entry| entry.event_id == event_id) {
            apply(entry);
            matched = true;
        }
        matched
    }
}

impl Clone for FailedEventQueue {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            max_size: self.max_size,
            dropped: Arc::clone(&self.dropped),
        }
    }
}

impl Default for FailedEventQueue {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl FailedEventStore for FailedEventQueue {
    fn enqueue(
        &self,
        event: FailedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), FailedEventStoreError>> + Send + '_>> {
        Box::pin(async move {
            self.push(event);
            Ok(())
        })
    }

    fn list_unresolved(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FailedEvent>, FailedEventStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            Ok(self
                .snapshot()
                .into_iter()
                .filter(|event| !event.resolved)
                .collect())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roomsync_core::failed_event::IngestionErrorKind;

    fn failed(id: &str) -> FailedEvent {
        FailedEvent {
            event_id: id.to_string(),
            source_header: Some("Z".to_string()),
            event_kind_header: Some("BOOKING".to_string()),
            correlation_id: None,
            reservation_id: None,
            raw_payload: "{}".to_string(),
            error_kind: IngestionErrorKind::InvalidSource,
            error_message: "unknown source: Z".to_string(),
            failed_at: Utc::now(),
            retry_count: 0,
            resolved: false,
        }
    }

    #[test]
    fn drops_oldest_when_full() {
        let queue = FailedEventQueue::new(2);
        assert!(queue.push(failed("a")).is_none());
        assert!(queue.push(failed("b")).is_none());
        let evicted = queue.push(failed("c")).unwrap();

        assert_eq!(evicted.event_id, "a");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().unwrap().event_id, "b");
        assert_eq!(queue.dropped_count(), 1);
    }

    #[tokio::test]
    async fn eviction_keeps_the_newest_failure_and_is_counted_across_clones() {
        let queue = FailedEventQueue::new(1);
        let shared = queue.clone();
        queue.enqueue(failed("a")).await.unwrap();
        shared.enqueue(failed("b")).await.unwrap();

        let ids: Vec<_> = queue
            .list_unresolved()
            .await
            .unwrap()
            .into_iter()
            .map(|event| event.event_id)
            .collect();
        assert_eq!(ids, vec!["b".to_string()]);
        assert_eq!(queue.dropped_count(), 1);
        assert!(!queue.resolve("a"));
    }

    #[test]
    fn drain_empties_queue() {
        let queue = FailedEventQueue::default();
        queue.push(failed("a"));
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn list_unresolved_skips_resolved_entries() {
        let queue = FailedEventQueue::default();
        queue.enqueue(failed("a")).await.unwrap();
        queue.enqueue(failed("b")).await.unwrap();

        assert!(queue.record_retry("a"));
        assert!(queue.resolve("a"));
        assert!(!queue.resolve("missing"));

        let pending = queue.list_unresolved().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_id, "b");
        assert_eq!(queue.snapshot()[0].retry_count, 1);
    }
}
