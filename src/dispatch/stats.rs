//! Process-wide counters shared by every adapter

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters aggregated across all connections and adapters.
#[derive(Debug, Default)]
pub struct GlobalStats {
    connected_clients: AtomicUsize,
    total_connections: AtomicU64,
    total_messages: AtomicU64,
    total_bytes: AtomicU64,
    total_errors: AtomicU64,
}

impl GlobalStats {
    pub(crate) fn client_connected(&self) {
        self.connected_clients.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn client_disconnected(&self) {
        // Saturate at zero instead of wrapping.
        let _ = self.connected_clients.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
            n.checked_sub(1)
        });
    }

    pub(crate) fn record_message(&self, wire_size: usize) {
        self.total_messages.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(wire_size as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GlobalStatsSnapshot {
        GlobalStatsSnapshot {
            connected_clients: self.connected_clients.load(Ordering::Relaxed),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            total_messages: self.total_messages.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`GlobalStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalStatsSnapshot {
    pub connected_clients: usize,
    pub total_connections: u64,
    pub total_messages: u64,
    pub total_bytes: u64,
    pub total_errors: u64,
}
