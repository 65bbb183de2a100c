//! Per-writer counters
//!
//! - Counters only, monotonic
//! - Thread-safe, Relaxed ordering (exactness per counter, not across counters)

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one index writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Entries written (after index-dependent expansion)
    entries_written: AtomicU64,
    /// Rows written to the primary table
    rows_written: AtomicU64,
    /// Rows written to the alternate table
    alt_rows_written: AtomicU64,
    /// Backend write handles opened
    handles_opened: AtomicU64,
    /// Statistics flush passes (explicit and automatic)
    stats_flushes: AtomicU64,
    /// Administrative setup actions performed
    setup_actions: AtomicU64,
    /// Administrative setup actions that failed
    setup_failures: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_entries(&self) {
        self.entries_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows(&self, rows: u64) {
        self.rows_written.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn add_alt_rows(&self, rows: u64) {
        self.alt_rows_written.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_handles_opened(&self) {
        self.handles_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stats_flushes(&self) {
        self.stats_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_setup_actions(&self) {
        self.setup_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_setup_failures(&self) {
        self.setup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entries_written: self.entries_written.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            alt_rows_written: self.alt_rows_written.load(Ordering::Relaxed),
            handles_opened: self.handles_opened.load(Ordering::Relaxed),
            stats_flushes: self.stats_flushes.load(Ordering::Relaxed),
            setup_actions: self.setup_actions.load(Ordering::Relaxed),
            setup_failures: self.setup_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of a writer's counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub entries_written: u64,
    pub rows_written: u64,
    pub alt_rows_written: u64,
    pub handles_opened: u64,
    pub stats_flushes: u64,
    pub setup_actions: u64,
    pub setup_failures: u64,
}

impl MetricsSnapshot {
    /// Render as a single JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
