//! Counters for toggle outcomes and latency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Process-lifetime counters, shared across the debounce and batch
/// paths. Latency is recorded from toggle invocation, so it includes
/// the debounce delay.
#[derive(Debug, Default)]
pub struct PerfMonitor {
    successes: AtomicU64,
    errors: AtomicU64,
    latency_total_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSnapshot {
    pub successes: u64,
    pub errors: u64,
    pub avg_latency_ms: u64,
}

impl PerfMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency: Duration) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.latency_total_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PerfSnapshot {
        let successes = self.successes.load(Ordering::Relaxed);
        let total = self.latency_total_ms.load(Ordering::Relaxed);
        PerfSnapshot {
            successes,
            errors: self.errors.load(Ordering::Relaxed),
            avg_latency_ms: if successes == 0 { 0 } else { total / successes },
        }
    }
}
