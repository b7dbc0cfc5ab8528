use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct AtomicMetrics {
    deposits_created: AtomicU64,
    deposits_settled: AtomicU64,
    already_processed: AtomicU64,
    settle_failures: AtomicU64,
    webhooks_received: AtomicU64,
    webhooks_rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub deposits_created: u64,
    pub deposits_settled: u64,
    pub already_processed: u64,
    pub settle_failures: u64,
    pub webhooks_received: u64,
    pub webhooks_rejected: u64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_created(&self) {
        self.deposits_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_settled(&self) {
        self.deposits_settled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_already_processed(&self) {
        self.already_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_settle_failures(&self) {
        self.settle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_webhooks_received(&self) {
        self.webhooks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_webhooks_rejected(&self) {
        self.webhooks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            deposits_created: self.deposits_created.load(Ordering::Relaxed),
            deposits_settled: self.deposits_settled.load(Ordering::Relaxed),
            already_processed: self.already_processed.load(Ordering::Relaxed),
            settle_failures: self.settle_failures.load(Ordering::Relaxed),
            webhooks_received: self.webhooks_received.load(Ordering::Relaxed),
            webhooks_rejected: self.webhooks_rejected.load(Ordering::Relaxed),
        }
    }
}
