//! Counters threaded through constructors instead of process-wide state.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    jobs_registered: AtomicU64,
    runs_dispatched: AtomicU64,
    runs_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_registered(&self) {
        self.jobs_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn run_dispatched(&self) {
        self.runs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn run_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_registered: self.jobs_registered.load(Ordering::Relaxed),
            runs_dispatched: self.runs_dispatched.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub jobs_registered: u64,
    pub runs_dispatched: u64,
    pub runs_failed: u64,
}
