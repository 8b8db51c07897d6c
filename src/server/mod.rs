// HTTP server - Axum router exposing the analysis endpoint
// State is built once at startup and shared read-only across requests.

pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::analysis::Analyzer;
use crate::config::Settings;
use crate::guard::PathGuard;

/// Shared state for all handlers
pub struct AppState {
    /// Validates client paths against the safe root
    pub guard: PathGuard,
    pub analyzer: Analyzer,
}

impl AppState {
    pub fn new(guard: PathGuard, analyzer: Analyzer) -> Self {
        Self { guard, analyzer }
    }
}

/// Full application router with request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::analysis_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to `settings.bind` and serve until Ctrl-C.
pub async fn serve(settings: &Settings, state: Arc<AppState>) -> std::io::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, draining connections..."),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
