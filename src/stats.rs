//! Run counters shared by all workers.
//!
//! `TrialStats` is updated lock-free from worker threads; `StatsSnapshot` is
//! the plain copy rendered in the run summary.
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::auth::TrialOutcome;

#[derive(Debug, Default)]
pub struct TrialStats {
    attempts: AtomicUsize,
    failures: AtomicUsize,
    connection_failures: AtomicUsize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub attempts: usize,
    pub failures: usize,
    pub connection_failures: usize,
}

impl TrialStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &TrialOutcome) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        match outcome {
            TrialOutcome::Success(_) => {}
            TrialOutcome::Failure => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            TrialOutcome::ConnectionFailed => {
                self.connection_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
        }
    }
}

fn pct(n: usize, d: usize) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}

impl StatsSnapshot {
    /// Share of attempts that never reached the authentication step.
    pub fn connection_failure_percentage(&self) -> String {
        pct(self.connection_failures, self.attempts)
    }
}
