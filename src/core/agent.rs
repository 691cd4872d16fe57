//! Wires the engine to the transport.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::config::AgentConfig;
use super::system_monitor::tasks::{publisher_task, reconnect_task};
use super::system_monitor::{MetricSnapshot, Scheduler, ScheduledSampler};
use super::transport::{PublishChannel, TransportStats};

/// A running agent: sampler loops, publisher and reconnect supervisor.
pub struct Agent {
    channel: Arc<PublishChannel>,
    scheduler: Scheduler,
    loops: Vec<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Agent {
    /// Connect (best effort) and spawn every loop on the current runtime.
    ///
    /// A failed initial connect is not fatal: the supervisor keeps retrying
    /// and publishes are counted as errors meanwhile.
    pub async fn start(
        config: &AgentConfig,
        samplers: Vec<ScheduledSampler>,
        channel: PublishChannel,
    ) -> Self {
        let channel = Arc::new(channel);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        log::info!(
            "Connecting to {}:{} as {}",
            config.broker.host,
            config.broker.port,
            config.client_id()
        );
        if let Err(e) = channel.connect().await {
            log::warn!("Initial connect failed, will retry: {}", e);
        }

        let scheduler = Scheduler::spawn(samplers, &shutdown_tx);
        let cadences = &config.cadences;
        let loops = vec![
            tokio::spawn(publisher_task(
                Arc::clone(&channel),
                config.hostname(),
                scheduler.snapshot(),
                cadences.publish(),
                shutdown_tx.subscribe(),
            )),
            tokio::spawn(reconnect_task(
                Arc::clone(&channel),
                cadences.reconnect(),
                shutdown_tx.subscribe(),
            )),
        ];

        log::info!("Publishing to {}", channel.topic());
        Self {
            channel,
            scheduler,
            loops,
            shutdown_tx,
        }
    }

    pub fn snapshot(&self) -> watch::Receiver<Arc<MetricSnapshot>> {
        self.scheduler.snapshot()
    }

    pub fn stats(&self) -> &Arc<TransportStats> {
        self.channel.stats()
    }

    /// Stop every loop, then flush and close the transport.
    pub async fn shutdown(self) {
        log::info!("Shutting down");
        let _ = self.shutdown_tx.send(());

        for handle in self.loops {
            if let Err(e) = handle.await {
                log::warn!("Agent task ended abnormally: {}", e);
            }
        }
        self.scheduler.join().await;
        self.channel.close().await;
    }
}
