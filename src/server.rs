use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        // ── Liveness ────────────────────────────────────────────
        .route("/health", get(handlers::health::liveness))
        // ── Admin performance surface ───────────────────────────
        .route("/admin/performance/stats", get(handlers::admin::get_stats))
        .route("/admin/performance/health", get(handlers::admin::get_health))
        .route(
            "/admin/performance/slow-queries",
            get(handlers::admin::get_slow_queries),
        )
        .route(
            "/admin/performance/endpoint",
            get(handlers::admin::get_endpoint),
        )
        .route("/admin/performance/reset", post(handlers::admin::reset_stats))
        .route("/admin/performance/stream", get(stream::metrics_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone());

    with_tracking(routes, state)
}

/// Wrap any router in the tracking stack (applied bottom-up):
/// panics become 500s *inside* the tracker so they are recorded.
pub fn with_tracking(router: Router, state: Arc<AppState>) -> Router {
    router
        .layer(CatchPanicLayer::new())
        .layer(axum_mw::from_fn_with_state(state, timing::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
