use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::core::agent::Agent;
use crate::core::config::AgentConfig;
use crate::core::system_monitor::host_samplers;
use crate::core::transport::{MqttTransport, PublishChannel, TransportStats};

/// Run the agent until Ctrl+C
pub fn execute(config: AgentConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("hostwatch-worker")
        .build()
        .context("Failed to start the tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: AgentConfig) -> Result<()> {
    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let stats = Arc::new(TransportStats::new());
    let transport = Arc::new(MqttTransport::new(&config, Arc::clone(&stats)));
    let channel = PublishChannel::new(transport, stats, config.topic());

    let agent = Agent::start(&config, host_samplers(&config), channel).await;

    stop_rx.recv().await;
    agent.shutdown().await;
    Ok(())
}
