//! MQTT transport on top of `rumqttc`.
//!
//! The rumqttc event loop only makes progress while it is polled, so a driver
//! task owns it. Connection acks and drops observed by the driver update
//! [`TransportStats`] straight away. After a connection error the driver
//! parks until [`Transport::connect`] is called again, which leaves retry
//! pacing to the reconnect supervisor. Wake-ups only reach a driver that is
//! already parked, so a `connect` issued while a connection attempt is in
//! flight does not turn into an early retry later.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::{Transport, TransportStats, RC_QUEUE_SIZE};
use crate::core::config::AgentConfig;
use crate::error::{HostwatchError, Result};

/// Requests buffered between the client handle and the event loop
const REQUEST_CAPACITY: usize = 16;
/// Largest payload we expect to publish
const MAX_PACKET_BYTES: usize = 256 * 1024;
/// How long shutdown waits for queued packets to drain
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub struct MqttTransport {
    client: AsyncClient,
    eventloop: Mutex<Option<EventLoop>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    retry: Arc<Notify>,
    closing: Arc<AtomicBool>,
    stats: Arc<TransportStats>,
}

impl MqttTransport {
    pub fn new(config: &AgentConfig, stats: Arc<TransportStats>) -> Self {
        let broker = &config.broker;
        let mut options = MqttOptions::new(config.client_id(), broker.host.clone(), broker.port);
        options
            .set_keep_alive(Duration::from_secs(broker.keepalive_secs))
            .set_clean_session(true)
            .set_max_packet_size(MAX_PACKET_BYTES, MAX_PACKET_BYTES);
        if let Some(username) = &broker.username {
            options.set_credentials(username.clone(), broker.password.clone().unwrap_or_default());
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        Self {
            client,
            eventloop: Mutex::new(Some(eventloop)),
            driver: Mutex::new(None),
            retry: Arc::new(Notify::new()),
            closing: Arc::new(AtomicBool::new(false)),
            stats,
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&self) -> Result<()> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(HostwatchError::transport("transport is closing"));
        }

        // First call hands the event loop to a driver; later calls wake it.
        let eventloop = self.eventloop.lock().take();
        match eventloop {
            Some(eventloop) => {
                let handle = tokio::spawn(drive(
                    eventloop,
                    Arc::clone(&self.stats),
                    Arc::clone(&self.retry),
                    Arc::clone(&self.closing),
                ));
                *self.driver.lock() = Some(handle);
            }
            None => self.retry.notify_waiters(),
        }
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if !self.stats.is_connected() {
            return Err(HostwatchError::NotConnected);
        }
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| HostwatchError::PublishRejected {
                rc: RC_QUEUE_SIZE,
                reason: e.to_string(),
            })
    }

    fn is_connected(&self) -> bool {
        self.stats.is_connected()
    }

    async fn disconnect(&self) -> Result<()> {
        self.closing.store(true, Ordering::SeqCst);

        let request = if self.stats.is_connected() {
            self.client.disconnect().await.map_err(|e| HostwatchError::transport(e.to_string()))
        } else {
            Ok(())
        };
        // A parked driver has to wake up to notice `closing`.
        self.retry.notify_waiters();

        let driver = self.driver.lock().take();
        if let Some(mut handle) = driver {
            if tokio::time::timeout(FLUSH_TIMEOUT, &mut handle).await.is_err() {
                log::warn!("MQTT driver did not finish within {:?}, aborting", FLUSH_TIMEOUT);
                handle.abort();
            }
        }
        self.stats.on_disconnected(None);
        request
    }
}

async fn drive(
    mut eventloop: EventLoop,
    stats: Arc<TransportStats>,
    retry: Arc<Notify>,
    closing: Arc<AtomicBool>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    log::info!("MQTT connected");
                    stats.on_connected();
                } else {
                    log::warn!("MQTT connect refused: {:?}", ack.code);
                    stats.on_disconnected(Some(format!("connect refused: {:?}", ack.code)));
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                log::warn!("MQTT broker closed the session");
                stats.on_disconnected(Some("broker closed the session".to_string()));
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                stats.on_disconnected(None);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if closing.load(Ordering::SeqCst) {
                    stats.on_disconnected(Some(e.to_string()));
                    break;
                }
                log::warn!("MQTT connection error: {}", e);

                // Register as a waiter before the state flips, so a
                // supervisor that sees "disconnected" always reaches us.
                let notified = retry.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                stats.on_disconnected(Some(e.to_string()));
                if closing.load(Ordering::SeqCst) {
                    break;
                }
                notified.await;
                if closing.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }
    log::debug!("MQTT driver stopped");
}
