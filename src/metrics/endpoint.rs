use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use super::percentiles::{nearest_rank, sorted_window};

/// Aggregation key: HTTP method plus normalized route template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub method: String,
    pub path: String,
}

impl EndpointKey {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Running counters for one endpoint.
///
/// `min_ms`/`max_ms` are all-time while `recent` is a sliding window, so
/// an old outlier can stay the reported max after it has left the window
/// that feeds the percentiles.
#[derive(Debug, Clone)]
pub struct EndpointStats {
    pub request_count: u64,
    pub error_count: u64,
    pub total_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    recent: VecDeque<f64>,
    window: usize,
}

/// Serializable per-endpoint view. Field names are consumed by the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EndpointSummary {
    pub method: String,
    pub path: String,
    pub count: u64,
    pub errors: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub recent_avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl EndpointStats {
    pub fn new(window: usize) -> Self {
        Self {
            request_count: 0,
            error_count: 0,
            total_ms: 0.0,
            min_ms: f64::INFINITY,
            max_ms: 0.0,
            recent: VecDeque::with_capacity(window + 1),
            window,
        }
    }

    pub fn record(&mut self, duration_ms: f64, is_error: bool) {
        self.request_count += 1;
        if is_error {
            self.error_count += 1;
        }
        self.total_ms += duration_ms;
        self.min_ms = self.min_ms.min(duration_ms);
        self.max_ms = self.max_ms.max(duration_ms);

        self.recent.push_back(duration_ms);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
    }

    pub fn avg_ms(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.total_ms / self.request_count as f64
    }

    /// Mean over the recent window only.
    pub fn recent_avg_ms(&self) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        self.recent.iter().sum::<f64>() / self.recent.len() as f64
    }

    /// Oldest first.
    pub fn recent_durations(&self) -> impl Iterator<Item = &f64> {
        self.recent.iter()
    }

    pub fn summary(&self, key: &EndpointKey) -> EndpointSummary {
        let sorted = sorted_window(&self.recent);
        EndpointSummary {
            method: key.method.clone(),
            path: key.path.clone(),
            count: self.request_count,
            errors: self.error_count,
            avg_ms: self.avg_ms(),
            min_ms: if self.request_count == 0 { 0.0 } else { self.min_ms },
            max_ms: self.max_ms,
            recent_avg_ms: self.recent_avg_ms(),
            p50_ms: nearest_rank(&sorted, 50.0),
            p95_ms: nearest_rank(&sorted, 95.0),
            p99_ms: nearest_rank(&sorted, 99.0),
        }
    }
}
