//! Roomsync simulator.
//!
//! Wires an in-process broker, provisions the scenario rooms and plays the
//! configured scenarios against it, printing each execution report.
//!
//! Run with: `SIMULATOR_SCENARIO=all cargo run -p roomsync-simulator`

use roomsync_broker::Broker;
use roomsync_core::environment::{RandomIds, SystemClock};
use roomsync_runtime::metrics::MetricsExporter;
use roomsync_simulator::metrics::register_simulator_metrics;
use roomsync_simulator::platform::provision_room;
use roomsync_simulator::{ChaosEngine, Config, InProcessSender, ScenarioRunner};
use roomsync_testing::mocks::{InMemoryRawEventStore, InMemoryRoomDirectory};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.broker.observability.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        scenarios = config.scenarios.len(),
        seed = ?config.seed,
        chaos = ?config.chaos,
        "Starting simulator"
    );

    let mut exporter = MetricsExporter::new();
    if config.broker.observability.metrics_enabled {
        exporter.install()?;
        roomsync_broker::metrics::register_business_metrics();
        register_simulator_metrics();
    }

    let directory = Arc::new(InMemoryRoomDirectory::new());
    for kind in &config.scenarios {
        let room = provision_room(&directory, kind.room());
        info!(room_code = kind.room(), room_id = %room.id, "Room provisioned");
    }

    let broker = Broker::new(
        &config.broker,
        directory.clone(),
        Arc::new(InMemoryRawEventStore::new()),
    );

    let chaos = match config.seed {
        Some(seed) => ChaosEngine::seeded(config.chaos, seed),
        None => ChaosEngine::new(config.chaos),
    };
    let runner = ScenarioRunner::new(
        Arc::new(InProcessSender::new(broker.router())),
        Arc::new(chaos),
        Arc::new(SystemClock),
        Arc::new(RandomIds),
    );

    let mut aborted = 0_usize;
    for kind in &config.scenarios {
        let scenario = kind.scenario();
        let result = runner.run(scenario.as_ref()).await;
        if !result.success {
            aborted += 1;
        }
        println!("{result}");
    }

    let audit = broker.reconciler().audit_log().await?;
    println!(
        "scenarios={} aborted={aborted} reservations={} audit_records={} failed_events={} failed_dropped={}",
        config.scenarios.len(),
        broker.ledger().reservations().len(),
        audit.len(),
        broker.failed_events().len(),
        broker.failed_events().dropped_count(),
    );

    if let Some(rendered) = exporter.render() {
        println!("{rendered}");
    }

    info!("Simulator finished");
    Ok(())
}
