use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One request that crossed the slow-query threshold.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlowQueryEntry {
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

/// Fixed-capacity ring of the most recent slow requests.
#[derive(Debug)]
pub struct SlowQueryLog {
    entries: VecDeque<SlowQueryEntry>,
    capacity: usize,
}

impl SlowQueryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, entry: SlowQueryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Up to `limit` entries, newest first.
    pub fn newest(&self, limit: usize) -> Vec<SlowQueryEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
