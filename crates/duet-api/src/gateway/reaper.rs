//! Periodic idle-session sweep.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::gateway::GatewayHandle;

/// Asks the coordinator for an idle sweep every `period` until the
/// coordinator stops.
#[must_use]
pub fn spawn_reaper(handle: GatewayHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if handle.reap_idle().await.is_err() {
                tracing::debug!("coordinator gone, reaper exiting");
                break;
            }
        }
    })
}
