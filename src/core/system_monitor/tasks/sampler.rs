//! Per category sampling loop.

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};

use crate::core::system_monitor::metrics::CategoryUpdate;
use crate::core::system_monitor::samplers::ScheduledSampler;

/// Run one sampler at its cadence, forwarding each complete block to the
/// orchestrator.
///
/// A failed sample is logged and skipped, so the orchestrator keeps the
/// previous block for that category.
pub async fn sampler_task(
    scheduled: ScheduledSampler,
    update_tx: mpsc::Sender<CategoryUpdate>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let ScheduledSampler { mut sampler, every } = scheduled;
    let category = sampler.category();
    log::debug!("{} sampler started ({:?})", category, every);

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Reads hit /proc and /sys synchronously; keep them off the
                // async workers so one slow category never stalls the others.
                let (returned, result) = match tokio::task::spawn_blocking(move || {
                    let result = sampler.sample();
                    (sampler, result)
                })
                .await
                {
                    Ok(done) => done,
                    Err(e) => {
                        log::error!("{} sampler aborted: {}", category, e);
                        break;
                    }
                };
                sampler = returned;

                match result {
                    Ok(update) => {
                        if update_tx.send(update).await.is_err() {
                            log::debug!("{} sampler: orchestrator gone", category);
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("{} sample failed, keeping previous block: {}", category, e);
                    }
                }
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }
    log::debug!("{} sampler stopped", category);
}
