//! HTTP server for live stress analysis.
//!
//! This module provides an HTTP server that:
//! - Accepts a session's full keystroke history via POST /analyze
//! - Re-derives features and scores the most recent window
//! - Reports artifact health via GET /health and counters via GET /stats
//!
//! # Architecture
//!
//! ```text
//! Typing client ──→ POST /analyze ──→ [Feature Pipeline] ──→ [Classifier] ──→ score/status
//! ```

use crate::analyzer::{AnalysisResult, StressAnalyzer, StressStatus};
use crate::core::normalizer::EventNormalizer;
use crate::error::AnalyzerError;
use crate::transparency::{ProcessingStats, SharedProcessingLog};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Upper bound on inferences running at once
    pub max_concurrent_inferences: usize,
}

impl ServerConfig {
    pub fn new(port: u16, max_concurrent_inferences: usize) -> Self {
        Self {
            port,
            max_concurrent_inferences: max_concurrent_inferences.max(1),
        }
    }
}

/// Shared server state. Read-only apart from the atomic counters.
pub struct ServerState {
    analyzer: StressAnalyzer,
    /// Bounds in-flight inferences
    inference_slots: Semaphore,
    log: SharedProcessingLog,
}

impl ServerState {
    pub fn new(config: &ServerConfig, analyzer: StressAnalyzer, log: SharedProcessingLog) -> Self {
        Self {
            analyzer,
            inference_slots: Semaphore::new(config.max_concurrent_inferences.max(1)),
            log,
        }
    }
}

/// Live keystroke history of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzePayload {
    /// Raw event records; malformed ones are skipped
    pub keystrokes: Vec<serde_json::Value>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::ServiceUnavailable(_) => {
                api_error(StatusCode::SERVICE_UNAVAILABLE, "MODEL_UNAVAILABLE", err.to_string())
            }
            AnalyzerError::FeatureAssembly(_) => {
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "FEATURE_ERROR", err.to_string())
            }
            AnalyzerError::Inference(_) => {
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "INFERENCE_ERROR", err.to_string())
            }
        }
    }
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let ready = state.analyzer.is_ready();
    Json(HealthResponse {
        status: if ready { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: ready,
        detail: state.analyzer.unavailable_reason().map(str::to_string),
    })
}

/// GET /stats
async fn stats(State(state): State<Arc<ServerState>>) -> Json<ProcessingStats> {
    Json(state.log.stats())
}

/// POST /analyze
///
/// Scores the most recent window of the submitted history, or reports
/// `collecting_data` until 20 key presses are available.
async fn analyze(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<AnalyzePayload>,
) -> Result<Json<AnalysisResult>, ApiError> {
    if let Some(reason) = state.analyzer.unavailable_reason() {
        return Err(AnalyzerError::ServiceUnavailable(reason.to_string()).into());
    }

    let _permit = state.inference_slots.acquire().await.map_err(|e| {
        api_error(StatusCode::SERVICE_UNAVAILABLE, "SHUTTING_DOWN", e.to_string())
    })?;

    let worker_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let normalized = EventNormalizer::normalize_raw(&payload.keystrokes);
        worker_state
            .log
            .record_events(payload.keystrokes.len() as u64, normalized.discarded as u64);
        worker_state.analyzer.analyze_counted(&normalized.events)
    })
    .await
    .map_err(|e| {
        tracing::error!("Analysis task failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", e.to_string())
    })?;

    match outcome {
        Ok(outcome) => {
            let result = outcome.result;
            state.log.record_derived(outcome.records_derived as u64);
            state.log.record_analysis(result.status != StressStatus::CollectingData);
            Ok(Json(result))
        }
        Err(e) => {
            tracing::error!("Analysis failed: {}", e);
            Err(e.into())
        }
    }
}

/// Build the router over shared state.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/analyze", post(analyze))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    analyzer: StressAnalyzer,
    log: SharedProcessingLog,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config, analyzer, log));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("TypeState server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
