//! # Roomsync Runtime
//!
//! Runtime pieces shared by the broker and the simulator.
//!
//! ## Core Components
//!
//! - **Effect Executor**: executes effect descriptions and feeds produced
//!   actions to an [`ActionSink`]
//! - **Failed-event queue**: bounded in-memory [`FailedEventStore`] backend
//! - **Metrics**: Prometheus exporter and metric descriptions
//!
//! ## Example
//!
//! ```ignore
//! use roomsync_runtime::EffectExecutor;
//!
//! let executor = EffectExecutor::new(Arc::new(sender));
//! let dispatched = executor.execute(plan).await;
//! ```
//!
//! [`FailedEventStore`]: roomsync_core::failed_event::FailedEventStore

use futures::future::join_all;
use roomsync_core::effect::Effect;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Bounded in-memory failed-event queue
pub mod failed_events;

/// Prometheus metrics for observability
pub mod metrics;

pub use failed_events::FailedEventQueue;

/// Receiver of actions produced by executed effects.
///
/// Dyn-compatible so executors can hold `Arc<dyn ActionSink<A>>`.
pub trait ActionSink<A>: Send + Sync {
    /// Handle one action.
    fn dispatch(&self, action: A) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Executes effect descriptions.
///
/// `Sequential` effects run one after another, each awaited to completion.
/// `Parallel` effects run concurrently on the current task. Every action an
/// effect produces is handed to the sink.
pub struct EffectExecutor<A> {
    sink: Arc<dyn ActionSink<A>>,
}

impl<A> Clone for EffectExecutor<A> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<A> EffectExecutor<A>
where
    A: Send + 'static,
{
    /// Create an executor feeding the given sink
    #[must_use]
    pub fn new(sink: Arc<dyn ActionSink<A>>) -> Self {
        Self { sink }
    }

    /// Execute an effect to completion.
    ///
    /// Returns the number of actions dispatched to the sink.
    pub fn execute(&self, effect: Effect<A>) -> Pin<Box<dyn Future<Output = usize> + Send + '_>> {
        Box::pin(async move {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    ::metrics::counter!("roomsync_effects_executed_total", "type" => "none")
                        .increment(1);
                    0
                },
                Effect::Dispatch(action) => {
                    tracing::trace!("Executing Effect::Dispatch");
                    ::metrics::counter!("roomsync_effects_executed_total", "type" => "dispatch")
                        .increment(1);
                    self.sink.dispatch(*action).await;
                    1
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    ::metrics::counter!("roomsync_effects_executed_total", "type" => "delay")
                        .increment(1);
                    tokio::time::sleep(duration).await;
                    self.sink.dispatch(*action).await;
                    1
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    ::metrics::counter!("roomsync_effects_executed_total", "type" => "future")
                        .increment(1);
                    if let Some(action) = fut.await {
                        self.sink.dispatch(action).await;
                        1
                    } else {
                        tracing::trace!("Effect::Future completed with no action");
                        0
                    }
                },
                Effect::Sequential(effects) => {
                    tracing::trace!("Executing Effect::Sequential with {} effects", effects.len());
                    ::metrics::counter!("roomsync_effects_executed_total", "type" => "sequential")
                        .increment(1);
                    let mut dispatched = 0;
                    for effect in effects {
                        dispatched += self.execute(effect).await;
                    }
                    dispatched
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    ::metrics::counter!("roomsync_effects_executed_total", "type" => "parallel")
                        .increment(1);
                    join_all(effects.into_iter().map(|effect| self.execute(effect)))
                        .await
                        .into_iter()
                        .sum()
                },
            }
        })
    }
}
