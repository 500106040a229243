use std::sync::Arc;

use anyhow::Context;
use perf_tracker::config::AppConfig;
use perf_tracker::{server, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("perf_tracker=info,tower_http=info")),
        )
        .compact()
        .init();

    // ── 1. Load configuration ────────────────────────────────────
    let cfg = AppConfig::load().context("loading configuration")?;
    info!(
        environment = ?cfg.environment,
        slow_query_threshold_ms = cfg.tracker.slow_query_threshold_ms,
        recent_window = cfg.tracker.recent_window,
        slow_log_capacity = cfg.tracker.slow_log_capacity,
        "configuration loaded"
    );

    // ── 2. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState::from_config(&cfg));

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "listening");
    info!("stats   → http://{addr}/admin/performance/stats");
    info!("health  → http://{addr}/admin/performance/health");
    info!("stream  → http://{addr}/admin/performance/stream");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
