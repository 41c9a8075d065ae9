//! Overlay metrics.
//!
//! Counts how lookups were served (loaded ledger vs. store query vs. fallback
//! to the base row) and how many records were written or removed.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for one translator instance.
#[derive(Debug, Default)]
pub struct OverlayMetrics {
    /// Lookups answered from an eagerly loaded ledger
    ledger_hits: AtomicUsize,

    /// Lookups that had to query the store
    store_lookups: AtomicUsize,

    /// Resolutions that fell back to the base value
    fallbacks: AtomicUsize,

    /// Records inserted or updated
    records_written: AtomicUsize,

    /// Records removed by empty writes or cascades
    records_deleted: AtomicUsize,
}

impl OverlayMetrics {
    /// Create a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lookup served by a loaded ledger.
    pub fn record_ledger_hit(&self) {
        self.ledger_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that queried the translation table.
    pub fn record_store_lookup(&self) {
        self.store_lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a resolution that returned the base value.
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one inserted or updated record.
    pub fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` records removed or tombstoned.
    pub fn record_deleted(&self, count: usize) {
        self.records_deleted.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the number of ledger hits.
    pub fn ledger_hits(&self) -> usize {
        self.ledger_hits.load(Ordering::Relaxed)
    }

    /// Get the number of store lookups.
    pub fn store_lookups(&self) -> usize {
        self.store_lookups.load(Ordering::Relaxed)
    }

    /// Get the number of base-value fallbacks.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Get the number of records written.
    pub fn records_written(&self) -> usize {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Get the number of records deleted.
    pub fn records_deleted(&self) -> usize {
        self.records_deleted.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.ledger_hits();
        let lookups = self.store_lookups();
        let total = hits + lookups;
        let ledger_hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            ledger_hits: hits,
            store_lookups: lookups,
            ledger_hit_rate,
            fallbacks: self.fallbacks(),
            records_written: self.records_written(),
            records_deleted: self.records_deleted(),
        }
    }

    /// Reset all counters to zero (useful for testing).
    pub fn reset(&self) {
        self.ledger_hits.store(0, Ordering::Relaxed);
        self.store_lookups.store(0, Ordering::Relaxed);
        self.fallbacks.store(0, Ordering::Relaxed);
        self.records_written.store(0, Ordering::Relaxed);
        self.records_deleted.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of [`OverlayMetrics`] for logging or serving as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub ledger_hits: usize,
    pub store_lookups: usize,

    /// Share of lookups served from a loaded ledger (0-100)
    pub ledger_hit_rate: f64,

    pub fallbacks: usize,
    pub records_written: usize,
    pub records_deleted: usize,
}

impl MetricsReport {
    /// Format as a single log line.
    pub fn format(&self) -> String {
        format!(
            "Overlay metrics: {} ledger hits, {} store lookups ({:.1}% from ledger), {} fallbacks, {} written, {} deleted",
            self.ledger_hits,
            self.store_lookups,
            self.ledger_hit_rate,
            self.fallbacks,
            self.records_written,
            self.records_deleted
        )
    }
}
