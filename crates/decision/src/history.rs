//! Violation history

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use violation::Source;

/// One recorded violation
#[derive(Debug, Clone, Serialize)]
pub struct ViolationEntry {
    pub source: Source,
    #[serde(skip)]
    pub at: Instant,
    pub recorded_at: DateTime<Utc>,
    pub details: String,
}

impl ViolationEntry {
    /// Age at `now`; entries stamped after `now` count as fresh
    pub fn age(&self, now: Instant) -> Duration {
        now.checked_duration_since(self.at).unwrap_or_default()
    }
}

/// Time-windowed violation history
#[derive(Debug, Clone)]
pub struct ViolationHistory {
    window: Duration,
    entries: VecDeque<ViolationEntry>,
    total_recorded: u64,
}

impl ViolationHistory {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: VecDeque::new(),
            total_recorded: 0,
        }
    }

    pub fn record(&mut self, source: Source, details: String, now: Instant) {
        self.entries.push_back(ViolationEntry {
            source,
            at: now,
            recorded_at: Utc::now(),
            details,
        });
        self.total_recorded += 1;
    }

    /// Drop entries older than the window
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.entries.retain(|e| e.age(now) <= window);
    }

    /// Entries of `source` within the window
    pub fn recent(&self, source: Source, now: Instant) -> usize {
        self.entries
            .iter()
            .filter(|e| e.source == source && e.age(now) <= self.window)
            .count()
    }

    /// All entries within the window
    pub fn recent_total(&self, now: Instant) -> usize {
        self.entries.iter().filter(|e| e.age(now) <= self.window).count()
    }

    /// Violations recorded since the last reset, including pruned ones
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViolationEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_recorded = 0;
    }
}
