//! Background timers
//!
//! The status ticker refreshes date, time and uptime on the configured
//! period and follows period changes published by the controller. The probe
//! emitter writes a constant trace entry on a fixed interval to keep the log
//! pipeline exercised.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::controller::Controller;
use crate::severity::Severity;
use crate::state::Status;

/// Default interval of the probe emitter
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(3);

/// Message written by the probe emitter
pub const PROBE_MESSAGE: &str = "Some trace log for testing";

/// Repeating timer whose first tick is one full period away
fn periodic(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Run the status ticker
///
/// Uptime is measured from `start`. Returns only if the controller goes
/// away.
pub async fn run_status_ticker(
    controller: Controller,
    mut period_updates: watch::Receiver<Duration>,
    start: std::time::Instant,
) {
    let mut period = *period_updates.borrow_and_update();
    let mut ticker = periodic(period);
    info!(period_secs = period.as_secs(), "Status ticker started");

    loop {
        tokio::select! {
            changed = period_updates.changed() => {
                if changed.is_err() {
                    warn!("Period channel closed, stopping status ticker");
                    return;
                }
                let new_period = *period_updates.borrow_and_update();
                if new_period != period {
                    debug!(
                        old_secs = period.as_secs(),
                        new_secs = new_period.as_secs(),
                        "Status update period changed"
                    );
                    period = new_period;
                    ticker = periodic(period);
                }
            }
            _ = ticker.tick() => {
                if controller.set_status(Status::capture(start)).await.is_err() {
                    warn!("State controller gone, stopping status ticker");
                    return;
                }
            }
        }
    }
}

/// Run the probe emitter, appending a trace entry every `every`
pub async fn run_probe_emitter(controller: Controller, every: Duration) {
    let mut ticker = periodic(every);
    loop {
        ticker.tick().await;
        if controller
            .append_log(Severity::Trace, PROBE_MESSAGE)
            .await
            .is_err()
        {
            warn!("State controller gone, stopping probe emitter");
            return;
        }
    }
}
