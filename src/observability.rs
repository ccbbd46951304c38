//! In-process delivery counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    batches_accepted: AtomicU64,
    batches_rejected: AtomicU64,
    messages_delivered: AtomicU64,
    idle_ticks: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_accepted(&self, messages: usize) {
        self.batches_accepted.fetch_add(1, Ordering::Relaxed);
        self.messages_delivered
            .fetch_add(messages as u64, Ordering::Relaxed);
        tracing::debug!(counter = "batches_accepted", messages, "Metric incremented");
    }

    pub fn batch_rejected(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "batches_rejected", "Metric incremented");
    }

    pub fn idle_tick(&self) {
        self.idle_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_accepted: self.batches_accepted.load(Ordering::Relaxed),
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub batches_accepted: u64,
    pub batches_rejected: u64,
    pub messages_delivered: u64,
    pub idle_ticks: u64,
}
