//! Run counters shared by reference between the engine's tasks

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct DiscoveryStats {
    items_listed: AtomicUsize,
    records_published: AtomicUsize,
    duplicates_skipped: AtomicUsize,
    types_listed: AtomicUsize,
    types_excluded: AtomicUsize,
    types_unmappable: AtomicUsize,
    types_failed: AtomicUsize,
    worker_faults: AtomicUsize,
}

/// Point-in-time copy of [`DiscoveryStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub items_listed: usize,
    pub records_published: usize,
    pub duplicates_skipped: usize,
    pub types_listed: usize,
    pub types_excluded: usize,
    pub types_unmappable: usize,
    pub types_failed: usize,
    pub worker_faults: usize,
}

impl DiscoveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_listed(&self) {
        self.items_listed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the running total, for progress logs
    pub fn record_published(&self) -> usize {
        self.records_published.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn duplicate_skipped(&self) {
        self.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn type_listed(&self) {
        self.types_listed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn type_excluded(&self) {
        self.types_excluded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn type_unmappable(&self) {
        self.types_unmappable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn type_failed(&self) {
        self.types_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_fault(&self) {
        self.worker_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            items_listed: self.items_listed.load(Ordering::Relaxed),
            records_published: self.records_published.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            types_listed: self.types_listed.load(Ordering::Relaxed),
            types_excluded: self.types_excluded.load(Ordering::Relaxed),
            types_unmappable: self.types_unmappable.load(Ordering::Relaxed),
            types_failed: self.types_failed.load(Ordering::Relaxed),
            worker_faults: self.worker_faults.load(Ordering::Relaxed),
        }
    }
}
