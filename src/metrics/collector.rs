use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use hdrhistogram::Histogram;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::info;

use super::endpoint::{EndpointKey, EndpointStats, EndpointSummary};
use super::health::{error_rate, HealthReport, HealthStatus, HealthThresholds};
use super::percentiles::{nearest_rank, sorted_window, PercentileSet};
use super::slow_log::{SlowQueryEntry, SlowQueryLog};
use super::{RecordError, RequestObservation};
use crate::config::TrackerConfig;
use crate::middleware::normalize::normalize_path;

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe metrics engine, one per process.
/// The tracking middleware calls `record()`, admin handlers read.
pub struct MetricsCollector {
    settings: TrackerConfig,
    thresholds: HealthThresholds,
    endpoints: RwLock<HashMap<EndpointKey, Arc<Mutex<EndpointStats>>>>,
    slow_log: Mutex<SlowQueryLog>,
    global: Mutex<GlobalInner>,
}

/// Process-wide totals.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    /// All-time mean across every endpoint
    pub avg_ms: f64,
    /// Median over the pooled recent windows of every endpoint
    pub median_ms: f64,
    pub requests_per_sec: f64,
    pub elapsed_secs: f64,
    pub endpoint_count: usize,
    /// All-time distribution (μs)
    pub latency_us: PercentileSet,
}

/// Complete snapshot shipped to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub global: GlobalStats,
    pub endpoints: Vec<EndpointSummary>,
    pub health: HealthStatus,
}

// ─── Internal state ──────────────────────────────────────────────

struct GlobalInner {
    e2e_hist: Histogram<u64>,
    // Wall-clock anchor for the request rate
    start_time: Option<Instant>,
}

impl GlobalInner {
    fn new() -> Self {
        Self {
            e2e_hist: Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
                .expect("histogram creation"),
            start_time: None,
        }
    }
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new(settings: TrackerConfig, thresholds: HealthThresholds) -> Self {
        Self {
            slow_log: Mutex::new(SlowQueryLog::new(settings.slow_log_capacity)),
            settings,
            thresholds,
            endpoints: RwLock::new(HashMap::new()),
            global: Mutex::new(GlobalInner::new()),
        }
    }

    pub fn settings(&self) -> &TrackerConfig {
        &self.settings
    }

    /// Fold one observation into the aggregates.
    ///
    /// The map guard is held for the whole update so a concurrent `reset`
    /// sees either none or all of it. Never does I/O.
    pub fn record(&self, obs: RequestObservation) -> Result<(), RecordError> {
        obs.validate()?;

        let key = EndpointKey::new(obs.method.as_str(), obs.path.as_str());

        let endpoints = self.endpoints.read();
        if let Some(cell) = endpoints.get(&key).cloned() {
            self.fold(&cell, key, &obs);
            return Ok(());
        }
        drop(endpoints);

        // First sight of this endpoint
        let window = self.settings.recent_window;
        let mut endpoints = self.endpoints.write();
        let cell = endpoints
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(EndpointStats::new(window))))
            .clone();
        self.fold(&cell, key, &obs);
        Ok(())
    }

    /// Caller holds the endpoint map guard.
    fn fold(&self, cell: &Mutex<EndpointStats>, key: EndpointKey, obs: &RequestObservation) {
        cell.lock().record(obs.duration_ms, obs.is_error());

        {
            let mut global = self.global.lock();
            global.start_time.get_or_insert_with(Instant::now);
            // Clamp to ≥ 1 μs
            let us = ((obs.duration_ms * 1000.0) as u64).max(HIST_LOW);
            global.e2e_hist.saturating_record(us);
        }

        if obs.duration_ms > self.settings.slow_query_threshold_ms {
            info!(
                endpoint = %key,
                status = obs.status_code,
                duration_ms = obs.duration_ms,
                "slow request"
            );
            self.slow_log.lock().push(SlowQueryEntry {
                method: key.method,
                path: key.path,
                status_code: obs.status_code,
                duration_ms: obs.duration_ms,
                timestamp: obs.timestamp,
            });
        }
    }

    /// Wipe all data — for test isolation and manual recovery.
    pub fn reset(&self) {
        let mut endpoints = self.endpoints.write();
        endpoints.clear();
        self.slow_log.lock().clear();
        *self.global.lock() = GlobalInner::new();
        info!("performance statistics reset");
    }

    /// Per-endpoint summaries ordered by method then path.
    pub fn endpoint_summaries(&self) -> Vec<EndpointSummary> {
        let endpoints = self.endpoints.read();
        let mut cells: Vec<(&EndpointKey, &Arc<Mutex<EndpointStats>>)> = endpoints.iter().collect();
        cells.sort_by(|a, b| a.0.cmp(b.0));
        cells
            .into_iter()
            .map(|(key, cell)| cell.lock().summary(key))
            .collect()
    }

    /// `path` may be raw; it is normalized the same way the middleware does.
    pub fn endpoint_stats(&self, method: &str, path: &str) -> Option<EndpointSummary> {
        let key = EndpointKey::new(method, normalize_path(path));
        let cell = self.endpoints.read().get(&key).cloned()?;
        let summary = cell.lock().summary(&key);
        Some(summary)
    }

    pub fn global_stats(&self) -> GlobalStats {
        let mut total_requests = 0u64;
        let mut total_errors = 0u64;
        let mut total_ms = 0.0;
        let mut pooled = Vec::new();

        let endpoint_count = {
            let endpoints = self.endpoints.read();
            for cell in endpoints.values() {
                let stats = cell.lock();
                total_requests += stats.request_count;
                total_errors += stats.error_count;
                total_ms += stats.total_ms;
                pooled.extend(stats.recent_durations().copied());
            }
            endpoints.len()
        };

        let (elapsed_secs, latency_us) = {
            let global = self.global.lock();
            let elapsed = global
                .start_time
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0);
            (elapsed, PercentileSet::from_histogram(&global.e2e_hist))
        };

        let rps = if elapsed_secs > 0.0 {
            total_requests as f64 / elapsed_secs
        } else {
            0.0
        };
        let avg_ms = if total_requests > 0 {
            total_ms / total_requests as f64
        } else {
            0.0
        };

        GlobalStats {
            total_requests,
            total_errors,
            error_rate: error_rate(total_requests, total_errors),
            avg_ms,
            median_ms: nearest_rank(&sorted_window(&pooled), 50.0),
            requests_per_sec: rps,
            elapsed_secs,
            endpoint_count,
            latency_us,
        }
    }

    /// Up to `limit` most recent slow requests, newest first.
    pub fn slow_queries(&self, limit: usize) -> Vec<SlowQueryEntry> {
        self.slow_log.lock().newest(limit)
    }

    pub fn health_status(&self) -> HealthReport {
        let endpoints = self.endpoint_summaries();
        let (requests, errors) = totals(&endpoints);
        self.thresholds.evaluate(requests, errors, &endpoints)
    }

    /// Produce a read-only snapshot for the dashboard.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let global = self.global_stats();
        let endpoints = self.endpoint_summaries();
        let health = self
            .thresholds
            .evaluate(global.total_requests, global.total_errors, &endpoints)
            .status;

        MetricsSnapshot {
            global,
            endpoints,
            health,
        }
    }
}

fn totals(endpoints: &[EndpointSummary]) -> (u64, u64) {
    endpoints
        .iter()
        .fold((0, 0), |(r, e), s| (r + s.count, e + s.errors))
}
