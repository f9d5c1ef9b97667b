use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared between a [`crate::BusClient`] and its worker.
#[derive(Debug, Default)]
pub struct BusStats {
    messages_sent: AtomicU64,
    queued: AtomicUsize,
    reconnects: AtomicU64,
    heartbeats_sent: AtomicU64,
    heartbeats_received: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStatsSnapshot {
    pub messages_sent: u64,
    pub queued: usize,
    pub reconnects: u64,
    pub heartbeats_sent: u64,
    pub heartbeats_received: u64,
}

impl BusStats {
    pub(crate) fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_queued(&self, len: usize) {
        self.queued.store(len, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ping(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pong(&self) {
        self.heartbeats_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            heartbeats_received: self.heartbeats_received.load(Ordering::Relaxed),
        }
    }
}
