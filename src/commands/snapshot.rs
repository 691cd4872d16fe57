use std::time::Duration;

use anyhow::Result;

use crate::core::config::AgentConfig;
use crate::core::system_monitor::{host_samplers, MetricSnapshot, Payload};
use crate::core::transport::TransportStatsSnapshot;

/// Gap between the two sampling rounds; rates need two counter readings
const ROUND_GAP: Duration = Duration::from_secs(1);

/// Sample every category twice and print one payload, without a broker
pub fn execute(config: &AgentConfig, pretty: bool) -> Result<()> {
    let mut samplers = host_samplers(config);
    let mut snapshot = MetricSnapshot::default();

    for round in 0..2 {
        if round > 0 {
            std::thread::sleep(ROUND_GAP.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        }
        for scheduled in samplers.iter_mut() {
            match scheduled.sampler.sample() {
                Ok(update) => snapshot.apply(update),
                Err(e) => log::warn!("{} sample failed: {}", scheduled.sampler.category(), e),
            }
        }
    }

    let payload = Payload::new(&config.hostname(), &snapshot, TransportStatsSnapshot::default());
    let json = if pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        String::from_utf8(payload.to_bytes()?)?
    };
    println!("{}", json);
    Ok(())
}
