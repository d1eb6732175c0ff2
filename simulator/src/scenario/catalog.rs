//! The built-in scenarios.

use super::{Scenario, ScenarioContext, ScenarioError, ScenarioKind, stay};
use crate::platform::PlatformSimulator;
use roomsync_core::source::EventKind;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

type Run<'a> = Pin<Box<dyn Future<Output = Result<(), ScenarioError>> + Send + 'a>>;

/// One guest books the same room and dates on all three platforms.
///
/// Exactly one booking can win; the other two must come back refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleBooking;

impl Scenario for SimpleBooking {
    fn name(&self) -> &'static str {
        ScenarioKind::SimpleBooking.name()
    }

    fn execute<'a>(&'a self, ctx: &'a ScenarioContext) -> Run<'a> {
        Box::pin(async move {
            let room = ScenarioKind::SimpleBooking.room();
            let stay = stay("2025-08-15", "2025-08-18")?;

            let alpha = ctx.alpha().book(room, "김민수", stay)?;
            ctx.emit(EventKind::Booking, &alpha).await;

            let beta = ctx.beta().book(room, "Minsu Kim", stay)?;
            ctx.emit(EventKind::Booking, &beta).await;

            let gamma = ctx.gamma().book(room, "김민수", stay)?;
            ctx.emit(EventKind::Booking, &gamma).await;
            Ok(())
        })
    }
}

/// Platforms retry a webhook they think timed out.
///
/// Each retry is a separate emit with its own event id; the broker has to
/// recognize the reservation, not the delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateRetry;

impl Scenario for DuplicateRetry {
    fn name(&self) -> &'static str {
        ScenarioKind::DuplicateRetry.name()
    }

    fn execute<'a>(&'a self, ctx: &'a ScenarioContext) -> Run<'a> {
        Box::pin(async move {
            let room = ScenarioKind::DuplicateRetry.room();
            let stay = stay("2025-09-01", "2025-09-03")?;

            let alpha = ctx.alpha().book(room, "박지현", stay)?;
            for _ in 0..3 {
                ctx.emit(EventKind::Booking, &alpha).await;
            }

            let beta = ctx.beta().book(room, "Jihyun Park", stay)?;
            for _ in 0..2 {
                ctx.emit(EventKind::Booking, &beta).await;
            }
            Ok(())
        })
    }
}

/// Book/cancel pairs from two platforms delivered as one shuffled batch.
///
/// A cancellation may reach the broker before its booking.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReorderedCancel;

impl Scenario for ReorderedCancel {
    fn name(&self) -> &'static str {
        ScenarioKind::ReorderedCancel.name()
    }

    fn execute<'a>(&'a self, ctx: &'a ScenarioContext) -> Run<'a> {
        Box::pin(async move {
            let room = ScenarioKind::ReorderedCancel.room();
            let stay = stay("2025-10-10", "2025-10-12")?;

            let alpha_book = ctx.alpha().book(room, "이서연", stay)?;
            let alpha_cancel = ctx.alpha().cancel(&alpha_book.reservation_id)?;
            let gamma_book = ctx.gamma().book(room, "이서연", stay)?;
            let gamma_cancel = ctx.gamma().cancel(&gamma_book.reservation_id)?;

            ctx.emit_batch(vec![
                (EventKind::Booking, alpha_book),
                (EventKind::Cancellation, alpha_cancel),
                (EventKind::Booking, gamma_book),
                (EventKind::Cancellation, gamma_cancel),
            ])
            .await;
            Ok(())
        })
    }
}

/// The compact-date platform delivers in lagging batches.
///
/// Source `B` books and is delivered at once; source `C` books the same
/// nights and cancels, each delivery held back by a batch lag.
#[derive(Debug, Clone, Copy)]
pub struct DelayedDelivery {
    /// Hold before the lagging booking is delivered
    pub booking_lag: Duration,
    /// Hold before the lagging cancellation is delivered
    pub cancel_lag: Duration,
}

impl Default for DelayedDelivery {
    fn default() -> Self {
        Self {
            booking_lag: Duration::from_millis(2000),
            cancel_lag: Duration::from_millis(1500),
        }
    }
}

impl Scenario for DelayedDelivery {
    fn name(&self) -> &'static str {
        ScenarioKind::DelayedDelivery.name()
    }

    fn execute<'a>(&'a self, ctx: &'a ScenarioContext) -> Run<'a> {
        Box::pin(async move {
            let room = ScenarioKind::DelayedDelivery.room();
            let stay = stay("2025-11-20", "2025-11-23")?;

            let beta = ctx.beta().book(room, "Yuna Lee", stay)?;
            ctx.emit(EventKind::Booking, &beta).await;

            let gamma = ctx.gamma().book(room, "이유나", stay)?;
            tracing::info!(
                reservation_id = %gamma.reservation_id,
                lag = ?self.booking_lag,
                "Holding batch delivery"
            );
            tokio::time::sleep(self.booking_lag).await;
            ctx.emit(EventKind::Booking, &gamma).await;

            let cancel = ctx.gamma().cancel(&gamma.reservation_id)?;
            tokio::time::sleep(self.cancel_lag).await;
            ctx.emit(EventKind::Cancellation, &cancel).await;
            Ok(())
        })
    }
}

/// All three platforms, every kind of chaos, one shuffled batch.
///
/// Source `A` books and cancels one night, source `B` books two, source `C`
/// books, cancels and books again.
#[derive(Debug, Clone, Copy, Default)]
pub struct MixedChaos;

impl Scenario for MixedChaos {
    fn name(&self) -> &'static str {
        ScenarioKind::MixedChaos.name()
    }

    fn execute<'a>(&'a self, ctx: &'a ScenarioContext) -> Run<'a> {
        Box::pin(async move {
            let room = ScenarioKind::MixedChaos.room();
            let one_night = stay("2025-12-24", "2025-12-25")?;
            let two_nights = stay("2025-12-24", "2025-12-26")?;

            let alpha_book = ctx.alpha().book(room, "최동욱", one_night)?;
            let alpha_cancel = ctx.alpha().cancel(&alpha_book.reservation_id)?;

            let beta_book = ctx.beta().book(room, "Dongwook Choi", two_nights)?;

            let gamma_first = ctx.gamma().book(room, "최동욱", one_night)?;
            let gamma_cancel = ctx.gamma().cancel(&gamma_first.reservation_id)?;
            let gamma_second = ctx.gamma().book(room, "최동욱", two_nights)?;

            ctx.emit_batch(vec![
                (EventKind::Booking, alpha_book),
                (EventKind::Cancellation, alpha_cancel),
                (EventKind::Booking, beta_book),
                (EventKind::Booking, gamma_first),
                (EventKind::Cancellation, gamma_cancel),
                (EventKind::Booking, gamma_second),
            ])
            .await;
            Ok(())
        })
    }
}
