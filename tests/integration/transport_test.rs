use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hostwatch::core::system_monitor::tasks::{publish_once, reconnect_task, supervise_once};
use hostwatch::core::system_monitor::MetricSnapshot;
use hostwatch::core::transport::{PublishChannel, Transport, TransportStats, RC_NO_CONN};
use hostwatch::error::{HostwatchError, Result};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Broker that is down until `accept_connects` is flipped
struct FlakyBroker {
    stats: Arc<TransportStats>,
    accept_connects: Mutex<bool>,
    connect_calls: Mutex<u32>,
}

#[async_trait]
impl Transport for FlakyBroker {
    async fn connect(&self) -> Result<()> {
        *self.connect_calls.lock() += 1;
        if *self.accept_connects.lock() {
            self.stats.on_connected();
            Ok(())
        } else {
            Err(HostwatchError::transport("connection refused"))
        }
    }

    fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<()> {
        if self.stats.is_connected() {
            Ok(())
        } else {
            Err(HostwatchError::NotConnected)
        }
    }

    fn is_connected(&self) -> bool {
        self.stats.is_connected()
    }

    async fn disconnect(&self) -> Result<()> {
        self.stats.on_disconnected(None);
        Ok(())
    }
}

fn setup() -> (Arc<PublishChannel>, Arc<FlakyBroker>) {
    let stats = Arc::new(TransportStats::new());
    let broker = Arc::new(FlakyBroker {
        stats: Arc::clone(&stats),
        accept_connects: Mutex::new(false),
        connect_calls: Mutex::new(0),
    });
    let channel = PublishChannel::new(broker.clone(), stats, "sys/agents/box/metrics".to_string());
    (Arc::new(channel), broker)
}

#[tokio::test]
async fn test_failed_publishes_then_one_reconnect() {
    let (channel, _broker) = setup();
    let snapshot = MetricSnapshot::default();

    for _ in 0..3 {
        assert!(!publish_once(&channel, "box", &snapshot));
    }

    let stats = channel.stats().snapshot();
    assert_eq!(stats.publish_err, 3);
    assert_eq!(stats.publish_ok, 0);
    assert!(!stats.is_connected);
    assert_eq!(stats.last_publish_rc, Some(RC_NO_CONN));

    assert!(supervise_once(&channel).await);

    let stats = channel.stats().snapshot();
    assert_eq!(stats.reconnects, 1);
    assert_eq!(
        stats.last_error.as_deref(),
        Some("Transport error: connection refused")
    );
}

#[tokio::test]
async fn test_supervisor_leaves_healthy_connection_alone() {
    let (channel, broker) = setup();
    *broker.accept_connects.lock() = true;
    channel.connect().await.unwrap();

    assert!(!supervise_once(&channel).await);
    assert_eq!(channel.stats().reconnects(), 0);
    assert_eq!(*broker.connect_calls.lock(), 1);

    assert!(publish_once(&channel, "box", &MetricSnapshot::default()));
    assert_eq!(channel.stats().publish_ok(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_loop_retries_until_connected() {
    let (channel, broker) = setup();
    let (shutdown_tx, _) = broadcast::channel(1);
    let task = tokio::spawn(reconnect_task(
        Arc::clone(&channel),
        Duration::from_secs(3),
        shutdown_tx.subscribe(),
    ));

    // Nothing before the first cadence elapses.
    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert_eq!(channel.stats().reconnects(), 0);

    tokio::time::sleep(Duration::from_millis(3200)).await;
    assert_eq!(channel.stats().reconnects(), 2);
    assert!(!channel.is_connected());

    *broker.accept_connects.lock() = true;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(channel.stats().reconnects(), 3);
    assert!(channel.is_connected());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(channel.stats().reconnects(), 3);

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_counters_are_monotonic_across_state_changes() {
    let (channel, broker) = setup();
    let snapshot = MetricSnapshot::default();
    let mut last = channel.stats().snapshot();

    for step in 0..12 {
        match step % 4 {
            0 => {
                publish_once(&channel, "box", &snapshot);
            }
            1 => {
                *broker.accept_connects.lock() = step % 8 == 1;
                supervise_once(&channel).await;
            }
            2 => {
                publish_once(&channel, "box", &snapshot);
            }
            _ => channel.stats().on_disconnected(Some("link dropped".to_string())),
        }

        let now = channel.stats().snapshot();
        assert!(now.publish_ok >= last.publish_ok);
        assert!(now.publish_err >= last.publish_err);
        assert!(now.reconnects >= last.reconnects);
        last = now;
    }
    assert!(last.publish_ok > 0);
    assert!(last.publish_err > 0);
}
