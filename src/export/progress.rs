//! Progress tracking for export operations
//!
//! Two views of progress: a per-slice [`ProgressSnapshot`] logged at a fixed
//! interval by each fetcher, and an optional aggregate progress bar shared by
//! all slices.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::utils::time::rate;

/// Point-in-time progress of one slice
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub partition: u32,
    /// Rows emitted so far
    pub processed: u64,
    /// Slice total reported by the first page
    pub total: u64,
    /// Rate since the previous snapshot
    pub docs_per_sec: f64,
}

impl ProgressSnapshot {
    /// Share of the slice total processed, in percent
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Slice[{}] Processed: {} - {:.0}% complete, docs/sec: {:.0}",
            self.partition,
            self.processed,
            self.percent(),
            self.docs_per_sec
        )
    }
}

/// Interval gate deciding when a slice may emit its next snapshot
#[derive(Debug, Clone)]
pub struct SnapshotClock {
    interval: Duration,
    last: Instant,
    since_last: u64,
}

impl SnapshotClock {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last: start,
            since_last: 0,
        }
    }

    /// Count `rows` and return a snapshot if the interval has elapsed at `now`
    pub fn record(
        &mut self,
        rows: u64,
        now: Instant,
        partition: u32,
        processed: u64,
        total: u64,
    ) -> Option<ProgressSnapshot> {
        self.since_last += rows;

        let elapsed = now.saturating_duration_since(self.last);
        if elapsed < self.interval {
            return None;
        }

        let snapshot = ProgressSnapshot {
            partition,
            processed,
            total,
            docs_per_sec: rate(self.since_last, elapsed),
        };
        self.last = now;
        self.since_last = 0;
        Some(snapshot)
    }
}

/// Aggregate progress tracker shared by all slices
///
/// Tracks document processing progress and optionally displays a progress bar
/// whose length grows as slices report their totals.
pub struct ProgressTracker {
    /// Number of documents processed so far
    processed: AtomicU64,
    /// Start time of the operation
    start_time: Instant,
    /// Progress bar (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display a progress bar
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Add a slice's total to the expected document count
    pub fn add_total(&self, total: u64) {
        if let Some(ref bar) = self.bar {
            bar.inc_length(total);
        }
    }

    /// Record `count` more processed documents
    ///
    /// # Returns
    /// * `u64` - Documents processed across all slices
    pub fn add(&self, count: u64) -> u64 {
        let processed = self.processed.fetch_add(count, Ordering::Relaxed) + count;

        if let Some(ref bar) = self.bar {
            bar.set_position(processed);
            bar.set_message(format!(
                "({:.0} docs/sec)",
                rate(processed, self.start_time.elapsed())
            ));
        }

        processed
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
