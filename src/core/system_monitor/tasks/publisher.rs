//! Snapshot publishing loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::core::system_monitor::metrics::{MetricSnapshot, Payload};
use crate::core::transport::PublishChannel;

/// Serialize the snapshot together with the current transport stats and hand
/// it to the channel. Returns whether the transport accepted it.
pub fn publish_once(channel: &PublishChannel, host: &str, snapshot: &MetricSnapshot) -> bool {
    let payload = Payload::new(host, snapshot, channel.stats().snapshot());
    match payload.to_bytes() {
        Ok(bytes) => channel.publish(bytes),
        Err(e) => {
            log::error!("Failed to serialize payload: {}", e);
            false
        }
    }
}

pub async fn publisher_task(
    channel: Arc<PublishChannel>,
    host: String,
    snapshot_rx: watch::Receiver<Arc<MetricSnapshot>>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Clone the Arc so the watch lock is not held while publishing.
                let snapshot = Arc::clone(&snapshot_rx.borrow());
                publish_once(&channel, &host, &snapshot);
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }
    log::debug!("Publisher stopped");
}
