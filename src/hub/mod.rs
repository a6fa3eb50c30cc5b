//! Connection registry and broadcast plumbing

pub mod client;
pub mod manager;

pub use client::{Client, ConnectionId, Outbound};
pub use manager::ConnectionManager;

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic service counters
///
/// Each counter is individually atomic; snapshots across counters are not
/// required to be consistent.
#[derive(Debug, Default)]
pub struct Stats {
    connections_accepted: AtomicU64,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
}

impl Stats {
    pub fn record_connection(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connections_accepted(&self) -> u64 {
        self.connections_accepted.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }
}
