//! Process-wide transport health counters.
//!
//! Mutated from the publisher task, the reconnect supervisor and the
//! transport's own connection callbacks, which may run on another thread.
//! Counters are atomics; the last result code and error sit behind a mutex.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct TransportStats {
    publish_ok: AtomicU64,
    publish_err: AtomicU64,
    reconnects: AtomicU64,
    is_connected: AtomicBool,
    last_publish_rc: Mutex<Option<i32>>,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time copy of [`TransportStats`], as embedded in the payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStatsSnapshot {
    pub publish_ok: u64,
    pub publish_err: u64,
    pub last_publish_rc: Option<i32>,
    pub is_connected: bool,
    pub reconnects: u64,
    pub last_error: Option<String>,
}

impl TransportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish_ok(&self, rc: i32) {
        self.publish_ok.fetch_add(1, Ordering::Relaxed);
        *self.last_publish_rc.lock() = Some(rc);
    }

    pub fn record_publish_err(&self, rc: Option<i32>, error: String) {
        self.publish_err.fetch_add(1, Ordering::Relaxed);
        if rc.is_some() {
            *self.last_publish_rc.lock() = rc;
        }
        *self.last_error.lock() = Some(error);
    }

    pub fn record_reconnect_attempt(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, error: String) {
        *self.last_error.lock() = Some(error);
    }

    /// Connection callback: broker acknowledged the session
    pub fn on_connected(&self) {
        self.is_connected.store(true, Ordering::SeqCst);
    }

    /// Connection callback: session lost or closed
    pub fn on_disconnected(&self, reason: Option<String>) {
        self.is_connected.store(false, Ordering::SeqCst);
        if let Some(reason) = reason {
            self.record_error(reason);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    pub fn publish_ok(&self) -> u64 {
        self.publish_ok.load(Ordering::Relaxed)
    }

    pub fn publish_err(&self) -> u64 {
        self.publish_err.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TransportStatsSnapshot {
        TransportStatsSnapshot {
            publish_ok: self.publish_ok(),
            publish_err: self.publish_err(),
            last_publish_rc: *self.last_publish_rc.lock(),
            is_connected: self.is_connected(),
            reconnects: self.reconnects(),
            last_error: self.last_error.lock().clone(),
        }
    }
}
