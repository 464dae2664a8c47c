//! Delivery counters for the hub

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time copy of the hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubMetrics {
    /// Connections currently registered
    pub live_connections: u64,
    /// Connections ever registered
    pub connections_registered: u64,
    /// Connections removed, including evictions
    pub connections_removed: u64,
    /// Payloads enqueued on a connection buffer
    pub delivered: u64,
    /// Payloads dropped because the buffer was full
    pub dropped_full: u64,
    /// Payloads dropped because the connection was closing
    pub dropped_closed: u64,
    /// Connections evicted for a full buffer
    pub slow_clients_evicted: u64,
}

impl HubMetrics {
    /// Total payloads dropped for any reason
    pub fn dropped(&self) -> u64 {
        self.dropped_full + self.dropped_closed
    }
}

/// Lock-free counters updated by the registry
#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    registered: AtomicU64,
    removed: AtomicU64,
    delivered: AtomicU64,
    dropped_full: AtomicU64,
    dropped_closed: AtomicU64,
    evicted: AtomicU64,
}

impl MetricsRecorder {
    pub(crate) fn registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn removed(&self) {
        self.removed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delivered(&self, n: u64) {
        if n > 0 {
            self.delivered.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub(crate) fn dropped_full(&self, n: u64) {
        if n > 0 {
            self.dropped_full.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub(crate) fn dropped_closed(&self, n: u64) {
        if n > 0 {
            self.dropped_closed.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub(crate) fn evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, live_connections: usize) -> HubMetrics {
        HubMetrics {
            live_connections: live_connections as u64,
            connections_registered: self.registered.load(Ordering::Relaxed),
            connections_removed: self.removed.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            slow_clients_evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recorder_is_zero() {
        let recorder = MetricsRecorder::default();
        assert_eq!(recorder.snapshot(0), HubMetrics::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let recorder = MetricsRecorder::default();
        recorder.registered();
        recorder.registered();
        recorder.removed();
        recorder.delivered(5);
        recorder.dropped_full(2);
        recorder.dropped_closed(1);
        recorder.evicted();

        let metrics = recorder.snapshot(1);
        assert_eq!(metrics.live_connections, 1);
        assert_eq!(metrics.connections_registered, 2);
        assert_eq!(metrics.connections_removed, 1);
        assert_eq!(metrics.delivered, 5);
        assert_eq!(metrics.dropped(), 3);
        assert_eq!(metrics.slow_clients_evicted, 1);
    }
}
