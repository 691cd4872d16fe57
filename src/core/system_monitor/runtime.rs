//! Scheduler and snapshot orchestrator.
//!
//! Each sampler runs in its own task and sends complete category blocks over
//! an mpsc channel. A single orchestrator task owns the [`MetricSnapshot`],
//! swaps blocks in as they arrive and republishes the whole snapshot through
//! a `watch` channel.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::metrics::{CategoryUpdate, MetricSnapshot};
use super::samplers::ScheduledSampler;
use super::tasks::sampler_task;

const UPDATE_CHANNEL_CAPACITY: usize = 32;

/// Running sampler loops plus the orchestrator
pub struct Scheduler {
    snapshot_rx: watch::Receiver<Arc<MetricSnapshot>>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the orchestrator and one loop per sampler on the current runtime.
    pub fn spawn(samplers: Vec<ScheduledSampler>, shutdown: &broadcast::Sender<()>) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(MetricSnapshot::default()));
        let (update_tx, update_rx) = mpsc::channel::<CategoryUpdate>(UPDATE_CHANNEL_CAPACITY);

        let mut handles = Vec::with_capacity(samplers.len() + 1);
        handles.push(tokio::spawn(orchestrator_task(
            update_rx,
            snapshot_tx,
            shutdown.subscribe(),
        )));

        for scheduled in samplers {
            handles.push(tokio::spawn(sampler_task(
                scheduled,
                update_tx.clone(),
                shutdown.subscribe(),
            )));
        }

        log::info!("Scheduler started {} sampler(s)", handles.len() - 1);
        Self {
            snapshot_rx,
            handles,
        }
    }

    /// A receiver following the latest snapshot
    pub fn snapshot(&self) -> watch::Receiver<Arc<MetricSnapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn latest(&self) -> Arc<MetricSnapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    /// Wait for every loop to finish. Call after signalling shutdown.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                log::warn!("Scheduler task ended abnormally: {}", e);
            }
        }
    }
}

/// Merges category updates into the snapshot. Single writer.
async fn orchestrator_task(
    mut update_rx: mpsc::Receiver<CategoryUpdate>,
    snapshot_tx: watch::Sender<Arc<MetricSnapshot>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut current = MetricSnapshot::default();

    loop {
        tokio::select! {
            update = update_rx.recv() => {
                let Some(update) = update else {
                    break;
                };
                log::trace!("{} block updated", update.category());
                current.apply(update);
                // Only fails without receivers; the Scheduler keeps one.
                let _ = snapshot_tx.send(Arc::new(current.clone()));
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }
    log::debug!("Orchestrator stopped");
}
