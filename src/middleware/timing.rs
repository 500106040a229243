use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::normalize::normalize_path;
use crate::metrics::{MetricsCollector, RequestObservation};
use crate::AppState;

/// Recorded when the request future is dropped before a response exists.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Tower-compatible middleware that times every request and folds the
/// result into the metrics collector. Also adds two response headers:
///
///   X-Response-Time-Us  — total wall time in microseconds
///   Server-Timing       — same value in the standard Server-Timing format
///
/// Recording is fail-open: a rejected observation is logged and dropped.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_owned();
    let path = normalize_path(req.uri().path());

    let guard = InFlight::start(state.metrics.clone(), method, path);
    let mut response = next.run(req).await;
    let elapsed = guard.started.elapsed();
    let us = elapsed.as_micros();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("x-response-time-us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("server-timing", val);
    }

    let status = response.status().as_u16();
    // Skip the noisy SSE feed
    if !guard.path.ends_with("/stream") {
        debug!(
            status,
            method = %guard.method,
            path = %guard.path,
            duration_us = us as u64,
            "request completed"
        );
    }
    guard.finish(status, elapsed);

    response
}

/// Owns the observation for one in-flight request. If dropped without
/// `finish`, the request was cancelled and is recorded as 499.
struct InFlight {
    metrics: Arc<MetricsCollector>,
    method: String,
    path: String,
    started: Instant,
    finished: bool,
}

impl InFlight {
    fn start(metrics: Arc<MetricsCollector>, method: String, path: String) -> Self {
        Self {
            metrics,
            method,
            path,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, status: u16, elapsed: Duration) {
        self.finished = true;
        self.submit(status, elapsed);
    }

    fn submit(&self, status: u16, elapsed: Duration) {
        let obs = RequestObservation::new(
            self.method.as_str(),
            self.path.as_str(),
            status,
            elapsed.as_secs_f64() * 1000.0,
        );
        if let Err(err) = self.metrics.record(obs) {
            warn!(
                method = %self.method,
                path = %self.path,
                error = %err,
                "dropping request observation"
            );
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            self.submit(CLIENT_CLOSED_REQUEST, self.started.elapsed());
        }
    }
}
