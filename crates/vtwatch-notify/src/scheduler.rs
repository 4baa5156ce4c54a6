//! Explicit scheduling loops: sleep until the next tick, run the cycle to
//! completion, repeat. Cancellation is a cooperative flag checked between
//! ticks, never a forced interrupt.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::watcher::WatchCycle;

pub struct Scheduler {
    live: Box<dyn WatchCycle>,
    upcoming: Box<dyn WatchCycle>,
    live_period: Duration,
    upcoming_period: Duration,
}

impl Scheduler {
    pub fn new(
        live: Box<dyn WatchCycle>,
        upcoming: Box<dyn WatchCycle>,
        live_period: Duration,
        upcoming_period: Duration,
    ) -> Self {
        Self {
            live,
            upcoming,
            live_period,
            upcoming_period,
        }
    }

    /// Drive both cycle loops until the shutdown flag flips. The two cycle
    /// types run concurrently; each is strictly serialized against its own
    /// previous run.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        tokio::join!(
            run_cycle_loop(self.live, self.live_period, shutdown.clone()),
            run_cycle_loop(self.upcoming, self.upcoming_period, shutdown),
        );
        info!("scheduler stopped");
    }
}

/// A tick never starts while the previous tick of the same cycle is still
/// executing; overlong cycles coalesce missed ticks instead of stacking.
/// Any cycle error is logged in full and the loop keeps ticking.
pub async fn run_cycle_loop(
    mut cycle: Box<dyn WatchCycle>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(cycle = cycle.name(), period_secs = period.as_secs(), "cycle loop started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = cycle.run_cycle().await {
                    error!(cycle = cycle.name(), "cycle failed: {err:#}");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(cycle = cycle.name(), "shutdown requested, stopping cycle loop");
                    break;
                }
            }
        }
    }
}
