//! Transport health supervision.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::transport::PublishChannel;

/// One supervisor check. Returns whether a reconnect was attempted.
///
/// Connect errors are recorded by the channel and logged here, never
/// propagated.
pub async fn supervise_once(channel: &PublishChannel) -> bool {
    if channel.is_connected() {
        return false;
    }

    channel.stats().record_reconnect_attempt();
    log::info!("Transport not connected, reconnecting");
    if let Err(e) = channel.connect().await {
        log::warn!("Reconnect failed: {}", e);
    }
    true
}

pub async fn reconnect_task(
    channel: Arc<PublishChannel>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    // The startup connect is already in flight; first check one cadence later.
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                supervise_once(&channel).await;
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }
    log::debug!("Reconnect supervisor stopped");
}
