//! Self-monitoring counters for the crash reporter
//!
//! The counters are updated from inside the panic hook, so they are plain
//! atomics: no locks, no allocation.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the reporter's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub failures_handled: u64,
    pub records_persisted: u64,
    pub persist_failures: u64,
    pub notifications_sent: u64,
    pub notification_failures: u64,
    pub previous_handler_calls: u64,
}

/// Lock-free counters describing what the reporter has done
#[derive(Debug, Default)]
pub struct ReporterStats {
    failures_handled: AtomicU64,
    records_persisted: AtomicU64,
    persist_failures: AtomicU64,
    notifications_sent: AtomicU64,
    notification_failures: AtomicU64,
    previous_handler_calls: AtomicU64,
}

impl ReporterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&self) {
        self.failures_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist(&self, success: bool) {
        let counter = if success {
            &self.records_persisted
        } else {
            &self.persist_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self, success: bool) {
        let counter = if success {
            &self.notifications_sent
        } else {
            &self.notification_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_previous_handler_call(&self) {
        self.previous_handler_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            failures_handled: self.failures_handled.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notification_failures: self.notification_failures.load(Ordering::Relaxed),
            previous_handler_calls: self.previous_handler_calls.load(Ordering::Relaxed),
        }
    }

    /// Log the current counters at info level
    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            "Crash reporter stats: failures={}, persisted={}, persist_failures={}, notified={}, notify_failures={}, chained={}",
            s.failures_handled,
            s.records_persisted,
            s.persist_failures,
            s.notifications_sent,
            s.notification_failures,
            s.previous_handler_calls
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_initial_snapshot_is_zero() {
        assert_eq!(ReporterStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let stats = ReporterStats::new();
        stats.record_failure();
        stats.record_persist(true);
        stats.record_persist(false);
        stats.record_notification(false);
        stats.record_previous_handler_call();

        let s = stats.snapshot();
        assert_eq!(s.failures_handled, 1);
        assert_eq!(s.records_persisted, 1);
        assert_eq!(s.persist_failures, 1);
        assert_eq!(s.notifications_sent, 0);
        assert_eq!(s.notification_failures, 1);
        assert_eq!(s.previous_handler_calls, 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let stats = Arc::new(ReporterStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_failure();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.snapshot().failures_handled, 800);
    }
}
