//! Thread-safe policy statistics, grounded on the `AtomicU64` counter
//! pattern in the teacher's `performance/metrics.rs`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ViolationKind;

#[derive(Debug, Default)]
struct Counters {
    total_checks: AtomicU64,
    disallowed_command: AtomicU64,
    denied_command: AtomicU64,
    protected_file: AtomicU64,
    protected_pattern: AtomicU64,
    suspicious_operation: AtomicU64,
}

/// Cheaply cloneable handle onto a shared set of check/violation counters.
#[derive(Debug, Clone)]
pub struct Stats {
    inner: Arc<Counters>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Counters::default()),
        }
    }

    pub(super) fn record_check(&self) {
        self.inner.total_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_violation(&self, kind: ViolationKind) {
        let counter = match kind {
            ViolationKind::DisallowedCommand => &self.inner.disallowed_command,
            ViolationKind::DeniedCommand => &self.inner.denied_command,
            ViolationKind::ProtectedFile => &self.inner.protected_file,
            ViolationKind::ProtectedPattern => &self.inner.protected_pattern,
            ViolationKind::SuspiciousOperation => &self.inner.suspicious_operation,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_checks(&self) -> u64 {
        self.inner.total_checks.load(Ordering::Relaxed)
    }

    pub fn violation_count(&self, kind: ViolationKind) -> u64 {
        let counter = match kind {
            ViolationKind::DisallowedCommand => &self.inner.disallowed_command,
            ViolationKind::DeniedCommand => &self.inner.denied_command,
            ViolationKind::ProtectedFile => &self.inner.protected_file,
            ViolationKind::ProtectedPattern => &self.inner.protected_pattern,
            ViolationKind::SuspiciousOperation => &self.inner.suspicious_operation,
        };
        counter.load(Ordering::Relaxed)
    }

    pub fn total_violations(&self) -> u64 {
        self.violation_count(ViolationKind::DisallowedCommand)
            + self.violation_count(ViolationKind::DeniedCommand)
            + self.violation_count(ViolationKind::ProtectedFile)
            + self.violation_count(ViolationKind::ProtectedPattern)
            + self.violation_count(ViolationKind::SuspiciousOperation)
    }

    pub fn violation_rate(&self) -> f64 {
        let total = self.total_checks();
        if total == 0 {
            0.0
        } else {
            self.total_violations() as f64 / total as f64
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
