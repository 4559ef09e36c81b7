//! Registry counters

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RegistryMetrics {
    update_cycles: AtomicU64,
    failed_cycles: AtomicU64,
    imports: AtomicU64,
    load_failures: AtomicU64,
    evictions: AtomicU64,
    notifications: AtomicU64,
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, succeeded: bool) {
        self.update_cycles.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.failed_cycles.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_import(&self) {
        self.imports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            update_cycles: self.update_cycles.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
            imports: self.imports.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RegistryMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub update_cycles: u64,
    pub failed_cycles: u64,
    pub imports: u64,
    pub load_failures: u64,
    /// Filters dropped because their artifact was swept
    pub evictions: u64,
    pub notifications: u64,
}
