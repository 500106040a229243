//! In-memory request performance tracker for the PPM API.
//!
//! Every request is timed by [`middleware::timing`], folded into the
//! process-wide [`metrics::MetricsCollector`], and read back through the
//! admin routes in [`handlers::admin`] behind the [`auth`] gate.

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Central metrics engine — the middleware pushes observations, admin routes read.
    pub metrics: Arc<metrics::MetricsCollector>,

    /// Permission gate for the admin surface.
    pub rbac: auth::Rbac,
}

impl AppState {
    /// Fresh, empty state. Built once at startup; tests build one each.
    pub fn from_config(cfg: &config::AppConfig) -> Self {
        Self {
            metrics: Arc::new(metrics::MetricsCollector::new(
                cfg.tracker.clone(),
                cfg.health.clone(),
            )),
            rbac: auth::Rbac::new(cfg.environment, &cfg.auth),
        }
    }
}
