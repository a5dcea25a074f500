//! Relay metrics for observability
//!
//! Counters updated by the hub and the per-connection tasks, exposed as a
//! serializable snapshot.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server-wide metrics
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    /// Currently open WebSocket connections
    pub active_connections: AtomicU64,
    /// Total connections since server start
    pub total_connections: AtomicU64,

    // Message metrics
    /// Client messages decoded and handed to the hub
    pub events_received: AtomicU64,
    /// Text frames that did not decode and were discarded
    pub decode_failures: AtomicU64,
    /// Notifications queued to connections
    pub notifications_sent: AtomicU64,

    // Error metrics
    /// Connections dropped because their outbound queue was closed
    pub send_failures: AtomicU64,
    /// Reader tasks that panicked
    pub reader_panics: AtomicU64,

    /// Server start time (for uptime calculation)
    start_time: Option<Instant>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    // Connection tracking
    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    // Message tracking
    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn notifications_sent(&self, count: usize) {
        self.notifications_sent.fetch_add(count as u64, Ordering::Relaxed);
    }

    // Error tracking
    pub fn send_failed(&self, count: usize) {
        self.send_failures.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn reader_panicked(&self) {
        self.reader_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Create a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            connections: ConnectionMetrics {
                active: self.active_connections.load(Ordering::Relaxed),
                total: self.total_connections.load(Ordering::Relaxed),
            },
            messages: MessageMetrics {
                received: self.events_received.load(Ordering::Relaxed),
                decode_failures: self.decode_failures.load(Ordering::Relaxed),
                sent: self.notifications_sent.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                send_failures: self.send_failures.load(Ordering::Relaxed),
                reader_panics: self.reader_panics.load(Ordering::Relaxed),
            },
        }
    }
}

/// Snapshot of all metrics (for serialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: ConnectionMetrics,
    pub messages: MessageMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    pub active: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetrics {
    pub received: u64,
    pub decode_failures: u64,
    pub sent: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub send_failures: u64,
    pub reader_panics: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// Connections currently held by the hub
    pub registered: u64,
    pub connections: u64,
    pub uptime_secs: u64,
}
