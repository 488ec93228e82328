// Engine metrics module
//
// Lightweight counters for the background synchronization tasks

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Engine counters
///
/// Uses atomic operations for thread-safe metric tracking without locks.
/// Logged on shutdown, or periodically by the host if it wants to.
#[derive(Debug)]
pub struct Metrics {
    /// Store snapshot or catalog refreshes that swapped in new data
    pub refreshes_succeeded: AtomicU64,

    /// Store snapshot or catalog refreshes that kept the stale value
    pub refreshes_failed: AtomicU64,

    pub events_appended: AtomicU64,

    /// Events removed from the buffer after an accepted batch
    pub events_delivered: AtomicU64,

    pub batches_failed: AtomicU64,

    /// Flushes that found another flush in flight
    pub flushes_skipped: AtomicU64,

    pub actions_queued: AtomicU64,

    pub actions_dispatched: AtomicU64,

    pub actions_failed: AtomicU64,

    /// Actions kept queued because the player lacked inventory space
    pub actions_deferred: AtomicU64,

    pub heartbeats_sent: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            refreshes_succeeded: AtomicU64::new(0),
            refreshes_failed: AtomicU64::new(0),
            events_appended: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            flushes_skipped: AtomicU64::new(0),
            actions_queued: AtomicU64::new(0),
            actions_dispatched: AtomicU64::new(0),
            actions_failed: AtomicU64::new(0),
            actions_deferred: AtomicU64::new(0),
            heartbeats_sent: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_refresh(&self, succeeded: bool) {
        if succeeded {
            self.refreshes_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_event_appended(&self) {
        self.events_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_events_delivered(&self, count: usize) {
        self.events_delivered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush_skipped(&self) {
        self.flushes_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_queued(&self) {
        self.actions_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_dispatched(&self) {
        self.actions_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_failed(&self) {
        self.actions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_deferred(&self) {
        self.actions_deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_heartbeat(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Events appended but not yet confirmed by the webstore
    pub fn events_outstanding(&self) -> u64 {
        self.events_appended
            .load(Ordering::Relaxed)
            .saturating_sub(self.events_delivered.load(Ordering::Relaxed))
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Storelink Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Refreshes: {} succeeded, {} failed",
            self.refreshes_succeeded.load(Ordering::Relaxed),
            self.refreshes_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Events: {} appended, {} delivered, {} outstanding, {} failed batches, {} skipped flushes",
            self.events_appended.load(Ordering::Relaxed),
            self.events_delivered.load(Ordering::Relaxed),
            self.events_outstanding(),
            self.batches_failed.load(Ordering::Relaxed),
            self.flushes_skipped.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Actions: {} queued, {} dispatched, {} failed, {} deferred",
            self.actions_queued.load(Ordering::Relaxed),
            self.actions_dispatched.load(Ordering::Relaxed),
            self.actions_failed.load(Ordering::Relaxed),
            self.actions_deferred.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Heartbeats sent: {}",
            self.heartbeats_sent.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.events_appended.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.events_outstanding(), 0);
    }

    #[test]
    fn test_record_refreshes() {
        let metrics = Metrics::new();

        metrics.record_refresh(true);
        metrics.record_refresh(true);
        metrics.record_refresh(false);

        assert_eq!(metrics.refreshes_succeeded.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.refreshes_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_events_outstanding() {
        let metrics = Metrics::new();

        for _ in 0..5 {
            metrics.record_event_appended();
        }
        metrics.record_events_delivered(3);

        assert_eq!(metrics.events_outstanding(), 2);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
