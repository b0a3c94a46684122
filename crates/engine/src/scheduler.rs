//! Periodic job runner with non-overlap guarantees.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Drive `job` every `period` until the shutdown flag flips.
///
/// The job future is awaited inline, so at most one execution of the
/// job is ever in flight: a cycle that outlives its period causes the
/// next tick to be coalesced instead of overlapping. Shutdown lets an
/// in-flight cycle finish.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately; consume it so the
    // first evaluation happens one period after startup.
    ticker.tick().await;

    info!(job = name, period_secs = period.as_secs(), "periodic job started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                job().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(job = name, "periodic job stopped");
}
