use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hostwatch::core::config::AgentConfig;
use hostwatch::core::system_monitor::metrics::{CpuBlock, SystemBlock};
use hostwatch::core::system_monitor::tasks::publish_once;
use hostwatch::core::system_monitor::{
    Category, CategoryUpdate, Payload, Sampler, ScheduledSampler, Scheduler,
};
use hostwatch::core::transport::{PublishChannel, Transport, TransportStats};
use hostwatch::error::{HostwatchError, Result};
use hostwatch::Agent;
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Connected broker that keeps every published message
struct RecordingBroker {
    stats: Arc<TransportStats>,
    sent: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl Transport for RecordingBroker {
    async fn connect(&self) -> Result<()> {
        self.stats.on_connected();
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.sent.lock().push((topic.to_string(), payload));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stats.is_connected()
    }

    async fn disconnect(&self) -> Result<()> {
        self.stats.on_disconnected(None);
        Ok(())
    }
}

impl RecordingBroker {
    fn payloads(&self) -> Vec<Payload> {
        self.sent
            .lock()
            .iter()
            .map(|(_, bytes)| serde_json::from_slice(bytes).unwrap())
            .collect()
    }

    /// Last payload published so far
    fn last(&self) -> Payload {
        self.payloads().pop().expect("nothing published yet")
    }
}

fn recording_channel() -> (PublishChannel, Arc<RecordingBroker>) {
    let stats = Arc::new(TransportStats::new());
    let broker = Arc::new(RecordingBroker {
        stats: Arc::clone(&stats),
        sent: Mutex::new(Vec::new()),
    });
    let channel = PublishChannel::new(
        broker.clone(),
        stats,
        "sys/agents/test-host/metrics".to_string(),
    );
    (channel, broker)
}

/// CPU sampler whose second call fails
struct FlakyCpu {
    calls: u32,
}

impl Sampler for FlakyCpu {
    fn category(&self) -> Category {
        Category::Cpu
    }

    fn sample(&mut self) -> Result<CategoryUpdate> {
        self.calls += 1;
        if self.calls == 2 {
            return Err(HostwatchError::source_read("/proc/stat vanished"));
        }
        Ok(CategoryUpdate::Cpu(CpuBlock {
            percent_total: self.calls as f32 * 10.0,
            count_logical: 4,
            ..Default::default()
        }))
    }
}

struct Uptime;

impl Sampler for Uptime {
    fn category(&self) -> Category {
        Category::System
    }

    fn sample(&mut self) -> Result<CategoryUpdate> {
        Ok(CategoryUpdate::System(SystemBlock {
            uptime_sec: 42,
            hostname: "test-host".to_string(),
            pid: 1,
        }))
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_sample_keeps_previous_block_in_payload() {
    let (shutdown_tx, _) = broadcast::channel(1);
    let scheduler = Scheduler::spawn(
        vec![ScheduledSampler::new(FlakyCpu { calls: 0 }, Duration::from_secs(1))],
        &shutdown_tx,
    );
    let (channel, broker) = recording_channel();
    channel.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(publish_once(&channel, "test-host", &scheduler.latest()));
    assert_eq!(broker.last().cpu.map(|c| c.percent_total), Some(10.0));

    // The tick at t=1s fails.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(publish_once(&channel, "test-host", &scheduler.latest()));
    assert_eq!(broker.last().cpu.map(|c| c.percent_total), Some(10.0));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(publish_once(&channel, "test-host", &scheduler.latest()));
    assert_eq!(broker.last().cpu.map(|c| c.percent_total), Some(30.0));

    shutdown_tx.send(()).unwrap();
    scheduler.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_agent_publishes_snapshots_with_transport_stats() {
    let config = AgentConfig {
        hostname: Some("test-host".to_string()),
        ..Default::default()
    };
    let (channel, broker) = recording_channel();
    let agent = Agent::start(
        &config,
        vec![
            ScheduledSampler::new(Uptime, config.cadences.fast()),
            ScheduledSampler::new(FlakyCpu { calls: 0 }, config.cadences.fast()),
        ],
        channel,
    )
    .await;

    tokio::time::sleep(Duration::from_millis(3500)).await;
    let stats = Arc::clone(agent.stats());
    agent.shutdown().await;

    let sent = broker.sent.lock().clone();
    assert!(sent.len() >= 3);
    assert!(sent
        .iter()
        .all(|(topic, _)| topic == "sys/agents/test-host/metrics"));

    let payloads = broker.payloads();
    let last = payloads.last().unwrap();
    assert_eq!(last.host, "test-host");
    assert_eq!(last.system.as_ref().map(|s| s.uptime_sec), Some(42));
    assert!(last.disk_io.is_none());
    assert!(last.temperatures.is_none());

    // Each payload carries the stats as they were before its own publish.
    let oks: Vec<u64> = payloads.iter().map(|p| p.mqtt_stats.publish_ok).collect();
    assert!(oks.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(stats.publish_ok(), payloads.len() as u64);
    assert!(!stats.is_connected());

    // Once the CPU block shows up it never disappears again.
    let first_cpu = payloads.iter().position(|p| p.cpu.is_some()).unwrap();
    assert!(payloads[first_cpu..].iter().all(|p| p.cpu.is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_agent_starts_even_when_broker_is_down() {
    struct DownBroker {
        stats: Arc<TransportStats>,
    }

    #[async_trait]
    impl Transport for DownBroker {
        async fn connect(&self) -> Result<()> {
            Err(HostwatchError::transport("connection refused"))
        }

        fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<()> {
            Err(HostwatchError::NotConnected)
        }

        fn is_connected(&self) -> bool {
            self.stats.is_connected()
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }
    }

    let stats = Arc::new(TransportStats::new());
    let channel = PublishChannel::new(
        Arc::new(DownBroker {
            stats: Arc::clone(&stats),
        }),
        Arc::clone(&stats),
        "sys/agents/test-host/metrics".to_string(),
    );
    let config = AgentConfig {
        hostname: Some("test-host".to_string()),
        ..Default::default()
    };

    let agent = Agent::start(&config, vec![ScheduledSampler::new(Uptime, config.cadences.fast())], channel).await;
    let mut snapshots = agent.snapshot();
    snapshots.changed().await.unwrap();
    assert!(snapshots.borrow().system.is_some());

    tokio::time::sleep(Duration::from_millis(3500)).await;
    agent.shutdown().await;

    assert!(stats.publish_err() >= 3);
    assert_eq!(stats.publish_ok(), 0);
    assert_eq!(stats.reconnects(), 1);
}
