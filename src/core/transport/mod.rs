//! Outbound publish/subscribe transport.
//!
//! [`Transport`] is the wire client seam; [`PublishChannel`] wraps it with
//! health accounting and [`mqtt::MqttTransport`] is the production client.

mod channel;
pub mod mqtt;
mod stats;

use async_trait::async_trait;

use crate::error::Result;

pub use channel::PublishChannel;
pub use mqtt::MqttTransport;
pub use stats::{TransportStats, TransportStatsSnapshot};

/// Publish accepted by the client
pub const RC_SUCCESS: i32 = 0;
/// No connection to the broker
pub const RC_NO_CONN: i32 = 4;
/// Outgoing queue is full
pub const RC_QUEUE_SIZE: i32 = 15;

/// A best-effort, at-most-once message transport.
///
/// Connection state changes are reported by the implementation itself as they
/// happen (through the [`TransportStats`] it was built with), not discovered
/// by polling.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start or retry the connection. Completion is signalled asynchronously.
    async fn connect(&self) -> Result<()>;

    /// Queue one message without waiting for the network
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Flush queued messages and close the session
    async fn disconnect(&self) -> Result<()>;
}
