//! Scenarios played against a real in-process broker.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use roomsync_broker::{Broker, Config};
use roomsync_core::source::{EventKind, SourceType};
use roomsync_simulator::platform::provision_room;
use roomsync_simulator::report::DUPLICATE_TAG;
use roomsync_simulator::scenario::{
    DelayedDelivery, DuplicateRetry, MixedChaos, ReorderedCancel, SimpleBooking,
};
use roomsync_simulator::{
    ChaosConfig, ChaosEngine, InProcessSender, ScenarioKind, ScenarioResult, ScenarioRunner,
};
use roomsync_testing::mocks::{
    InMemoryRawEventStore, InMemoryRoomDirectory, SequentialIds, test_clock,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    broker: Broker,
    runner: ScenarioRunner,
}

fn harness(chaos: ChaosEngine) -> Harness {
    let directory = Arc::new(InMemoryRoomDirectory::new());
    for kind in ScenarioKind::ALL {
        provision_room(&directory, kind.room());
    }
    let broker = Broker::new(
        &Config::default(),
        directory,
        Arc::new(InMemoryRawEventStore::new()),
    );
    let runner = ScenarioRunner::new(
        Arc::new(InProcessSender::new(broker.router())),
        Arc::new(chaos),
        Arc::new(test_clock()),
        Arc::new(SequentialIds::new()),
    );
    Harness { broker, runner }
}

fn delivered_by_source(result: &ScenarioResult, source: SourceType) -> Vec<bool> {
    result
        .report
        .entries()
        .iter()
        .filter(|entry| entry.source == source)
        .map(|entry| entry.delivered)
        .collect()
}

#[tokio::test]
async fn simple_booking_lets_exactly_one_platform_win() {
    let h = harness(ChaosEngine::disabled());

    let result = h.runner.run(&SimpleBooking).await;

    assert!(result.success, "{result}");
    assert_eq!(delivered_by_source(&result, SourceType::Alpha), vec![true]);
    assert_eq!(delivered_by_source(&result, SourceType::Beta), vec![false]);
    assert_eq!(delivered_by_source(&result, SourceType::Gamma), vec![false]);

    let summary = result.report.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.chaotic, 0);

    assert_eq!(h.broker.ledger().reservations().len(), 1);
    assert!(h.broker.failed_events().is_empty());
}

#[tokio::test]
async fn retried_bookings_create_one_reservation() {
    let h = harness(ChaosEngine::disabled());

    let result = h.runner.run(&DuplicateRetry).await;

    assert!(result.success);
    assert_eq!(
        delivered_by_source(&result, SourceType::Alpha),
        vec![true, true, true]
    );
    assert_eq!(
        delivered_by_source(&result, SourceType::Beta),
        vec![false, false]
    );

    let event_ids: Vec<&str> = result
        .report
        .entries()
        .iter()
        .map(|entry| entry.event_id.as_str())
        .collect();
    let mut unique = event_ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), event_ids.len());

    assert_eq!(h.broker.ledger().reservations().len(), 1);
}

#[tokio::test]
async fn ordered_cancellations_free_the_room_for_the_next_platform() {
    let h = harness(ChaosEngine::disabled());

    let result = h.runner.run(&ReorderedCancel).await;

    assert!(result.success);
    let summary = result.report.summary();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.delivered, 4);

    let kinds: Vec<EventKind> = result.report.entries().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Booking,
            EventKind::Cancellation,
            EventKind::Booking,
            EventKind::Cancellation,
        ]
    );
    assert_eq!(h.broker.ledger().reservations().len(), 2);
    assert!(h.broker.failed_events().is_empty());
}

#[tokio::test]
async fn lagging_platform_loses_the_race_and_cancels_quietly() {
    let h = harness(ChaosEngine::disabled());
    let scenario = DelayedDelivery {
        booking_lag: Duration::ZERO,
        cancel_lag: Duration::ZERO,
    };

    let result = h.runner.run(&scenario).await;

    assert!(result.success);
    assert_eq!(delivered_by_source(&result, SourceType::Beta), vec![true]);
    // The lagging booking is refused; its cancellation finds nothing to undo.
    assert_eq!(
        delivered_by_source(&result, SourceType::Gamma),
        vec![false, true]
    );
    assert_eq!(h.broker.ledger().reservations().len(), 1);
}

#[tokio::test]
async fn mixed_chaos_without_disruption_is_deterministic() {
    let h = harness(ChaosEngine::disabled());

    let result = h.runner.run(&MixedChaos).await;

    assert!(result.success);
    assert_eq!(
        delivered_by_source(&result, SourceType::Alpha),
        vec![true, true]
    );
    assert_eq!(delivered_by_source(&result, SourceType::Beta), vec![true]);
    assert_eq!(
        delivered_by_source(&result, SourceType::Gamma),
        vec![false, true, false]
    );
}

#[tokio::test]
async fn duplicated_deliveries_reuse_the_event_id() {
    let chaos = ChaosConfig {
        duplicate_probability: 1.0,
        max_duplicates: 1,
        ..ChaosConfig::none()
    };
    let h = harness(ChaosEngine::seeded(chaos, 7));

    let result = h.runner.run(&SimpleBooking).await;

    let entries = result.report.entries();
    assert_eq!(entries.len(), 6);
    for pair in entries.chunks(2) {
        assert_eq!(pair[0].event_id, pair[1].event_id);
        assert_eq!(pair[0].chaos, "DUP(x1)");
        assert_eq!(pair[1].chaos, DUPLICATE_TAG);
    }

    // The copy of the winning booking is an idempotent replay.
    assert!(entries[0].delivered);
    assert!(entries[1].delivered);
    assert_eq!(result.report.summary().chaotic, 6);
    assert_eq!(h.broker.ledger().reservations().len(), 1);
}

#[tokio::test]
async fn dropped_deliveries_never_reach_the_broker() {
    let chaos = ChaosConfig {
        failure_probability: 1.0,
        ..ChaosConfig::none()
    };
    let h = harness(ChaosEngine::seeded(chaos, 7));

    let result = h.runner.run(&SimpleBooking).await;

    let summary = result.report.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.delivered, 0);
    assert!(
        result
            .report
            .entries()
            .iter()
            .all(|entry| entry.chaos == "FAIL")
    );
    assert!(h.broker.ledger().reservations().is_empty());
    assert!(h.broker.failed_events().is_empty());
}

#[tokio::test]
async fn every_run_gets_its_own_correlation_id() {
    let h = harness(ChaosEngine::disabled());

    let first = h.runner.run(&SimpleBooking).await;
    let second = h.runner.run(&DuplicateRetry).await;

    assert_ne!(
        first.report.correlation_id(),
        second.report.correlation_id()
    );
    assert_eq!(first.report.duration_ms(), 0);
}

#[tokio::test]
async fn all_scenarios_run_to_completion() {
    let h = harness(ChaosEngine::disabled());

    for kind in [
        ScenarioKind::SimpleBooking,
        ScenarioKind::DuplicateRetry,
        ScenarioKind::ReorderedCancel,
        ScenarioKind::MixedChaos,
    ] {
        let result = h.runner.run(kind.scenario().as_ref()).await;
        assert!(result.success, "{kind} aborted: {:?}", result.error);
        assert_eq!(result.scenario, kind.name());
    }
}
