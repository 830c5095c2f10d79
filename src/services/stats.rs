use crate::models::Stats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// In-process counters of verification outcomes.
pub struct VerificationStats {
    checks_started: AtomicU64,
    activated: AtomicU64,
    not_found: AtomicU64,
    service_unavailable: AtomicU64,
    deadline_exceeded: AtomicU64,
    rejected_duplicate: AtomicU64,
    rejected_no_intent: AtomicU64,
    store_failed: AtomicU64,
    start_time: Instant,
}

#[derive(Debug, Clone, Copy)]
pub enum StatEvent {
    CheckStarted,
    Activated,
    NotFound,
    ServiceUnavailable,
    DeadlineExceeded,
    RejectedDuplicate,
    RejectedNoIntent,
    StoreFailed,
}

impl Default for VerificationStats {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationStats {
    pub fn new() -> Self {
        Self {
            checks_started: AtomicU64::new(0),
            activated: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            service_unavailable: AtomicU64::new(0),
            deadline_exceeded: AtomicU64::new(0),
            rejected_duplicate: AtomicU64::new(0),
            rejected_no_intent: AtomicU64::new(0),
            store_failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, event: StatEvent) {
        let counter = match event {
            StatEvent::CheckStarted => &self.checks_started,
            StatEvent::Activated => &self.activated,
            StatEvent::NotFound => &self.not_found,
            StatEvent::ServiceUnavailable => &self.service_unavailable,
            StatEvent::DeadlineExceeded => &self.deadline_exceeded,
            StatEvent::RejectedDuplicate => &self.rejected_duplicate,
            StatEvent::RejectedNoIntent => &self.rejected_no_intent,
            StatEvent::StoreFailed => &self.store_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            checks_started: self.checks_started.load(Ordering::Relaxed),
            activated: self.activated.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            service_unavailable: self.service_unavailable.load(Ordering::Relaxed),
            deadline_exceeded: self.deadline_exceeded.load(Ordering::Relaxed),
            rejected_duplicate: self.rejected_duplicate.load(Ordering::Relaxed),
            rejected_no_intent: self.rejected_no_intent.load(Ordering::Relaxed),
            store_failed: self.store_failed.load(Ordering::Relaxed),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
