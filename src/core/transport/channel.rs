use std::sync::Arc;

use super::{Transport, TransportStats, RC_SUCCESS};
use crate::error::Result;

/// Fire-and-forget publishing with health accounting.
///
/// Failed publishes are counted and never retried here: retries come from
/// the reconnect supervisor and the next publish tick.
pub struct PublishChannel {
    transport: Arc<dyn Transport>,
    stats: Arc<TransportStats>,
    topic: String,
}

impl PublishChannel {
    pub fn new(transport: Arc<dyn Transport>, stats: Arc<TransportStats>, topic: String) -> Self {
        Self {
            transport,
            stats,
            topic,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn stats(&self) -> &Arc<TransportStats> {
        &self.stats
    }

    /// Ask the transport to (re)connect. Errors are recorded in
    /// `last_error` before being returned.
    pub async fn connect(&self) -> Result<()> {
        self.transport.connect().await.inspect_err(|e| {
            self.stats.record_error(e.to_string());
        })
    }

    /// Publish one payload. Returns whether the transport accepted it.
    pub fn publish(&self, payload: Vec<u8>) -> bool {
        match self.transport.publish(&self.topic, payload) {
            Ok(()) => {
                self.stats.record_publish_ok(RC_SUCCESS);
                true
            }
            Err(e) => {
                log::debug!("Publish to {} failed: {}", self.topic, e);
                self.stats.record_publish_err(e.publish_rc(), e.to_string());
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Flush and disconnect; errors are logged, shutdown continues
    pub async fn close(&self) {
        if let Err(e) = self.transport.disconnect().await {
            log::warn!("Transport did not close cleanly: {}", e);
        }
    }
}
