//! Session counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one chat session
#[derive(Clone)]
pub struct SessionMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    turns: AtomicU64,
    delivered: AtomicU64,
    blocked: AtomicU64,
    actions_invoked: AtomicU64,
    total_latency_us: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record a delivered run
    pub fn record_delivered(&self, actions: usize, latency_us: u64) {
        self.inner.delivered.fetch_add(1, Ordering::Relaxed);
        self.record_run(actions, latency_us);
    }

    /// Record a blocked run
    pub fn record_blocked(&self, actions: usize, latency_us: u64) {
        self.inner.blocked.fetch_add(1, Ordering::Relaxed);
        self.record_run(actions, latency_us);
    }

    fn record_run(&self, actions: usize, latency_us: u64) {
        self.inner.turns.fetch_add(1, Ordering::Relaxed);
        self.inner
            .actions_invoked
            .fetch_add(actions as u64, Ordering::Relaxed);
        self.inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            turns: self.inner.turns.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            blocked: self.inner.blocked.load(Ordering::Relaxed),
            actions_invoked: self.inner.actions_invoked.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of session metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub turns: u64,
    pub delivered: u64,
    pub blocked: u64,
    pub actions_invoked: u64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Average latency per turn
    pub fn avg_latency_us(&self) -> u64 {
        if self.turns == 0 {
            0
        } else {
            self.total_latency_us / self.turns
        }
    }

    /// Fraction of turns that were blocked
    pub fn block_rate(&self) -> f64 {
        if self.turns == 0 {
            0.0
        } else {
            self.blocked as f64 / self.turns as f64
        }
    }
}
