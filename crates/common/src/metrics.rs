//! Metrics collection for ripple.
//!
//! In-process counters for monitoring mutation throughput and the
//! best-effort realtime layer. The publish-failure counters are the
//! observability hook for failures that are otherwise only logged.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get the global metrics instance.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Application metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    // === Content Metrics ===
    /// Posts created
    pub posts_created: AtomicU64,
    /// Likes created
    pub likes_created: AtomicU64,
    /// Likes removed
    pub likes_removed: AtomicU64,
    /// Comments created
    pub comments_created: AtomicU64,
    /// Reposts created
    pub reposts_created: AtomicU64,
    /// Notifications created
    pub notifications_created: AtomicU64,
    /// Notifications suppressed (self-action)
    pub notifications_suppressed: AtomicU64,

    // === Real-time Metrics ===
    /// Events published to the relay
    pub realtime_publishes: AtomicU64,
    /// Publish attempts dropped after a relay failure
    pub realtime_publish_failures: AtomicU64,
    /// Active WebSocket connections
    pub websocket_connections_active: AtomicU64,
    /// Total WebSocket messages sent
    pub websocket_messages_sent: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            posts_created: AtomicU64::new(0),
            likes_created: AtomicU64::new(0),
            likes_removed: AtomicU64::new(0),
            comments_created: AtomicU64::new(0),
            reposts_created: AtomicU64::new(0),
            notifications_created: AtomicU64::new(0),
            notifications_suppressed: AtomicU64::new(0),
            realtime_publishes: AtomicU64::new(0),
            realtime_publish_failures: AtomicU64::new(0),
            websocket_connections_active: AtomicU64::new(0),
            websocket_messages_sent: AtomicU64::new(0),
        }
    }

    /// Record a successful realtime publish.
    pub fn record_publish(&self) {
        self.realtime_publishes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped realtime publish.
    pub fn record_publish_failure(&self) {
        self.realtime_publish_failures
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            posts_created: self.posts_created.load(Ordering::Relaxed),
            likes_created: self.likes_created.load(Ordering::Relaxed),
            likes_removed: self.likes_removed.load(Ordering::Relaxed),
            comments_created: self.comments_created.load(Ordering::Relaxed),
            reposts_created: self.reposts_created.load(Ordering::Relaxed),
            notifications_created: self.notifications_created.load(Ordering::Relaxed),
            notifications_suppressed: self.notifications_suppressed.load(Ordering::Relaxed),
            realtime_publishes: self.realtime_publishes.load(Ordering::Relaxed),
            realtime_publish_failures: self.realtime_publish_failures.load(Ordering::Relaxed),
            websocket_connections_active: self.websocket_connections_active.load(Ordering::Relaxed),
            websocket_messages_sent: self.websocket_messages_sent.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub posts_created: u64,
    pub likes_created: u64,
    pub likes_removed: u64,
    pub comments_created: u64,
    pub reposts_created: u64,
    pub notifications_created: u64,
    pub notifications_suppressed: u64,
    pub realtime_publishes: u64,
    pub realtime_publish_failures: u64,
    pub websocket_connections_active: u64,
    pub websocket_messages_sent: u64,
}
