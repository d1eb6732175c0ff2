//! Broker assembly.
//!
//! Wires the router, translators and reconciler over an in-memory ledger and
//! a bounded failed-event queue. Only the room directory and raw store are
//! supplied by the caller.

use crate::config::Config;
use crate::ingestion::{IngestionEnvironment, IngestionRouter};
use crate::reconciler::{LedgerEnvironment, Reconciler};
use crate::store::InMemoryLedgerRepository;
use crate::translator::TranslatorRegistry;
use roomsync_core::environment::{Clock, IdGenerator, RandomIds, SystemClock};
use roomsync_core::raw_event::RawEventStore;
use roomsync_core::room::RoomDirectory;
use roomsync_runtime::FailedEventQueue;
use std::sync::Arc;

/// A fully wired broker.
pub struct Broker {
    router: Arc<IngestionRouter>,
    ledger: Arc<InMemoryLedgerRepository>,
    failed_events: FailedEventQueue,
}

impl Broker {
    /// Wire a broker with the system clock and random ids
    #[must_use]
    pub fn new(
        config: &Config,
        directory: Arc<dyn RoomDirectory>,
        raw_store: Arc<dyn RawEventStore>,
    ) -> Self {
        Self::with_environment(
            config,
            directory,
            raw_store,
            Arc::new(SystemClock),
            Arc::new(RandomIds),
        )
    }

    /// Wire a broker with an explicit clock and id source
    #[must_use]
    pub fn with_environment(
        config: &Config,
        directory: Arc<dyn RoomDirectory>,
        raw_store: Arc<dyn RawEventStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let failed_events = FailedEventQueue::new(config.ingestion.failed_event_capacity);

        let reconciler = Arc::new(Reconciler::new(
            directory,
            ledger.clone(),
            LedgerEnvironment::new(Arc::clone(&clock), Arc::clone(&ids)),
        ));
        let env = IngestionEnvironment::new(
            raw_store,
            Arc::new(failed_events.clone()),
            clock,
            ids,
        );

        tracing::info!(
            failed_event_capacity = config.ingestion.failed_event_capacity,
            "Broker wired"
        );

        Self {
            router: Arc::new(IngestionRouter::new(
                env,
                TranslatorRegistry::standard(),
                reconciler,
            )),
            ledger,
            failed_events,
        }
    }

    /// The ingestion entry point
    #[must_use]
    pub fn router(&self) -> Arc<IngestionRouter> {
        Arc::clone(&self.router)
    }

    /// The reconciler behind the router
    #[must_use]
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        self.router.reconciler()
    }

    /// Direct view of the ledger tables
    #[must_use]
    pub fn ledger(&self) -> &InMemoryLedgerRepository {
        &self.ledger
    }

    /// Failed events recorded so far
    #[must_use]
    pub const fn failed_events(&self) -> &FailedEventQueue {
        &self.failed_events
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roomsync_core::raw_event::DeliveryHeaders;
    use roomsync_core::source::SourceType;
    use roomsync_testing::mocks::{InMemoryRawEventStore, InMemoryRoomDirectory};

    #[tokio::test]
    async fn failed_event_capacity_comes_from_config() {
        let config = Config::from_lookup(|key| {
            (key == "BROKER_FAILED_EVENT_CAPACITY").then(|| "2".to_string())
        });
        let broker = Broker::new(
            &config,
            Arc::new(InMemoryRoomDirectory::new()),
            Arc::new(InMemoryRawEventStore::new()),
        );

        for _ in 0..3 {
            broker
                .router()
                .ingest("garbage", &DeliveryHeaders::for_source(SourceType::Alpha.code()))
                .await;
        }

        assert_eq!(broker.failed_events().max_size(), 2);
        assert_eq!(broker.failed_events().len(), 2);
        assert_eq!(broker.failed_events().dropped_count(), 1);
    }
}
