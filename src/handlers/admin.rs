use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::Permission;
use crate::metrics::{EndpointSummary, HealthReport, MetricsSnapshot, SlowQueryEntry};
use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SlowQueryParams {
    /// Kept as text so a malformed value gets our JSON 400
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EndpointParams {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct SlowQueryList {
    pub limit: usize,
    pub threshold_ms: f64,
    pub entries: Vec<SlowQueryEntry>,
}

#[derive(Debug, Serialize)]
pub struct ResetStatus {
    pub reset: bool,
    pub message: String,
}

// ─── GET /admin/performance/stats ────────────────────────────────

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MetricsSnapshot>, AppError> {
    state.rbac.authorize(&headers, Permission::PerformanceRead)?;
    Ok(Json(state.metrics.snapshot()))
}

// ─── GET /admin/performance/health ───────────────────────────────

pub async fn get_health(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<HealthReport>, AppError> {
    state.rbac.authorize(&headers, Permission::PerformanceRead)?;
    Ok(Json(state.metrics.health_status()))
}

// ─── GET /admin/performance/slow-queries?limit=N ─────────────────

pub async fn get_slow_queries(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<SlowQueryParams>, QueryRejection>,
) -> Result<Json<SlowQueryList>, AppError> {
    state.rbac.authorize(&headers, Permission::PerformanceRead)?;
    let Query(params) = params.map_err(bad_query)?;

    let settings = state.metrics.settings();
    let limit = parse_limit(params.limit.as_deref(), settings.slow_log_capacity)?;

    Ok(Json(SlowQueryList {
        limit,
        threshold_ms: settings.slow_query_threshold_ms,
        entries: state.metrics.slow_queries(limit),
    }))
}

/// Query rejections surface only after the caller is authorized.
fn bad_query(rejection: QueryRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Absent → `capacity`; negative or non-numeric → 400; clamped to `capacity`.
fn parse_limit(raw: Option<&str>, capacity: usize) -> Result<usize, AppError> {
    let Some(raw) = raw else {
        return Ok(capacity);
    };
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("limit must be an integer, got '{raw}'")))?;
    if value < 0 {
        return Err(AppError::BadRequest("limit must not be negative".into()));
    }
    Ok((value as u64).min(capacity as u64) as usize)
}

// ─── GET /admin/performance/endpoint?method=GET&path=/projects/42 ─

pub async fn get_endpoint(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<EndpointParams>, QueryRejection>,
) -> Result<Json<EndpointSummary>, AppError> {
    state.rbac.authorize(&headers, Permission::PerformanceRead)?;
    let Query(params) = params.map_err(bad_query)?;

    state
        .metrics
        .endpoint_stats(&params.method, &params.path)
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "no traffic observed for {} {}",
                params.method.to_ascii_uppercase(),
                params.path
            ))
        })
}

// ─── POST /admin/performance/reset ───────────────────────────────

pub async fn reset_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ResetStatus>, AppError> {
    let principal = state.rbac.authorize(&headers, Permission::PerformanceReset)?;

    state.metrics.reset();
    info!(user_id = %principal.user_id, "performance statistics reset by admin");

    Ok(Json(ResetStatus {
        reset: true,
        message: "All performance statistics cleared".into(),
    }))
}
