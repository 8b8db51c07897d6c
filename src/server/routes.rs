// REST route for file analysis
// Responses carry the file's basename only, never the resolved path.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use crate::analysis::DEFAULT_SECONDS;
use crate::analysis::result::AnalysisResult;
use crate::error::ServiceError;

// ---- Request types ----

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub path: String,
    /// Maximum seconds of audio to analyze; <= 0 analyzes everything
    #[serde(default = "default_seconds")]
    pub seconds: i64,
}

fn default_seconds() -> i64 {
    DEFAULT_SECONDS
}

// ---- Route registration ----

pub fn analysis_routes() -> Router<Arc<AppState>> {
    Router::new().route("/analyze/path", post(analyze_path))
}

// ---- Handlers ----

/// Validate the path, then run the analysis on the blocking pool.
async fn analyze_path(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ServiceError> {
    let Json(request) = payload.inspect_err(|rejection| {
        tracing::warn!("Rejected analysis request body: {}", rejection.body_text());
    })?;

    let target = state.guard.approve(&request.path)?;

    let seconds = request.seconds;
    let worker_state = state.clone();
    let result = tokio::task::spawn_blocking(move || worker_state.analyzer.analyze(&target, seconds))
        .await
        .map_err(|e| {
            tracing::error!("Analysis task did not complete: {}", e);
            ServiceError::analyzer(format!("analysis task failed: {}", e))
        })??;

    Ok(Json(result))
}
