pub mod collector;
pub mod endpoint;
pub mod health;
pub mod percentiles;
pub mod slow_log;
pub mod stream;

pub use collector::{GlobalStats, MetricsCollector, MetricsSnapshot};
pub use endpoint::{EndpointKey, EndpointStats, EndpointSummary};
pub use health::{HealthReport, HealthStatus, HealthThresholds};
pub use slow_log::{SlowQueryEntry, SlowQueryLog};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A single completed request, produced by the tracking middleware.
/// This is the "write" side — folded into the aggregates and dropped.
#[derive(Debug, Clone)]
pub struct RequestObservation {
    /// e.g. "GET"
    pub method: String,
    /// Normalized route template, e.g. "/projects/{id}"
    pub path: String,
    pub status_code: u16,
    /// Wall-clock time from request receipt to response (ms)
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

impl RequestObservation {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        duration_ms: f64,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status_code,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    /// 4xx and 5xx both count against the error rate.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }

    fn validate(&self) -> Result<(), RecordError> {
        if self.method.is_empty() {
            return Err(RecordError::EmptyMethod);
        }
        if self.path.is_empty() {
            return Err(RecordError::EmptyPath);
        }
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(RecordError::InvalidDuration(self.duration_ms));
        }
        Ok(())
    }
}

/// Why an observation was rejected. Never reaches an HTTP caller.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("observation has an empty method")]
    EmptyMethod,
    #[error("observation has an empty path")]
    EmptyPath,
    #[error("invalid duration: {0}ms")]
    InvalidDuration(f64),
}
