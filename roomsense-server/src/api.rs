// Roomsense Server - HTTP query surface
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP routes over a shared [`Monitor`].
//!
//! Handlers never touch the source. Everything they return is derived from
//! one history snapshot plus the current alert settings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use roomsense::{
    AlertState, Channel, ExportError, ExportOutcome, HistorySnapshot, IngestStats,
    IngestStatsSnapshot, Monitor, MonitorReport, Thresholds,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics;

/// Application state shared across handlers.
pub struct AppState {
    pub monitor: Monitor,
    pub stats: Arc<IngestStats>,
    pub source_name: String,
    pub export_path: PathBuf,
    pub start_time: Instant,
}

pub type SharedState = Arc<AppState>;

/// Errors returned to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("thresholds must be finite numbers")]
    InvalidThresholds,

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    #[error("export task failed: {0}")]
    Task(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidThresholds => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UnknownChannel(_) => StatusCode::NOT_FOUND,
            ApiError::Export(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .route("/history", get(history_handler))
        .route("/history/:channel", get(channel_history_handler))
        .route("/report", get(report_handler))
        .route("/alerts", get(alerts_handler))
        .route(
            "/thresholds",
            get(get_thresholds_handler).put(put_thresholds_handler),
        )
        .route("/security", get(get_security_handler).put(put_security_handler))
        .route("/security/toggle", post(toggle_security_handler))
        .route("/export", post(export_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Roomsense</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        a { color: #3498db; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>Roomsense</h1>
    <p>Room sensor telemetry: light, distance and temperature.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><a href="/report">/report</a> - Analytics and alerts (JSON)</div>
        <div class="endpoint"><a href="/history">/history</a> - Rolling history (JSON), <code>/history/{light,distance,temperature}</code> for one channel</div>
        <div class="endpoint"><a href="/alerts">/alerts</a> - Alert states (JSON)</div>
        <div class="endpoint"><a href="/thresholds">/thresholds</a> - Alert thresholds, <code>PUT</code> to change</div>
        <div class="endpoint"><a href="/security">/security</a> - Security mode, <code>PUT</code> or <code>POST /security/toggle</code></div>
        <div class="endpoint"><code>POST /export</code> - Write the full log as CSV</div>
        <div class="endpoint"><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><a href="/ready">/ready</a> - Readiness check</div>
        <div class="endpoint"><a href="/status">/status</a> - Status information (JSON)</div>
    </div>
</body>
</html>"#,
    )
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler. Not ready once the source has closed.
async fn ready_handler(State(state): State<SharedState>) -> impl IntoResponse {
    if state.stats.snapshot().running {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Source closed")
    }
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    uptime: String,
    source: String,
    ingest: IngestStatsSnapshot,
    history_len: usize,
    capacity: usize,
}

fn format_uptime(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    let uptime_secs = state.start_time.elapsed().as_secs();
    let history = state.monitor.history();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs,
        uptime: format_uptime(uptime_secs),
        source: state.source_name.clone(),
        ingest: state.stats.snapshot(),
        history_len: history.len(),
        capacity: history.capacity(),
    })
}

async fn history_handler(State(state): State<SharedState>) -> Json<HistorySnapshot> {
    Json(state.monitor.snapshot())
}

/// One channel's values, oldest first.
async fn channel_history_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<f64>>, ApiError> {
    let channel = Channel::from_name(&name).ok_or(ApiError::UnknownChannel(name))?;
    Ok(Json(state.monitor.channel_history(channel)))
}

async fn report_handler(State(state): State<SharedState>) -> Json<MonitorReport> {
    Json(state.monitor.report())
}

async fn alerts_handler(State(state): State<SharedState>) -> Json<AlertState> {
    Json(state.monitor.alerts())
}

async fn get_thresholds_handler(State(state): State<SharedState>) -> Json<Thresholds> {
    Json(state.monitor.settings().thresholds())
}

async fn put_thresholds_handler(
    State(state): State<SharedState>,
    Json(thresholds): Json<Thresholds>,
) -> Result<Json<Thresholds>, ApiError> {
    if !thresholds.is_finite() {
        return Err(ApiError::InvalidThresholds);
    }
    state.monitor.settings().set_thresholds(thresholds);
    tracing::info!(
        light = thresholds.light,
        distance = thresholds.distance,
        temperature = thresholds.temperature,
        "Thresholds updated"
    );
    Ok(Json(thresholds))
}

/// Security mode body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityMode {
    pub enabled: bool,
}

async fn get_security_handler(State(state): State<SharedState>) -> Json<SecurityMode> {
    Json(SecurityMode {
        enabled: state.monitor.settings().security_mode(),
    })
}

async fn put_security_handler(
    State(state): State<SharedState>,
    Json(mode): Json<SecurityMode>,
) -> Json<SecurityMode> {
    state.monitor.settings().set_security_mode(mode.enabled);
    tracing::info!(enabled = mode.enabled, "Security mode set");
    Json(mode)
}

async fn toggle_security_handler(State(state): State<SharedState>) -> Json<SecurityMode> {
    let enabled = state.monitor.settings().toggle_security_mode();
    tracing::info!(enabled, "Security mode toggled");
    Json(SecurityMode { enabled })
}

/// Export result.
#[derive(Debug, Serialize)]
struct ExportResponse {
    status: &'static str,
    rows: usize,
    path: String,
}

/// Export handler - writes the full log to the configured path.
async fn export_handler(State(state): State<SharedState>) -> Result<Json<ExportResponse>, ApiError> {
    let monitor = state.monitor.clone();
    let path = state.export_path.clone();

    let outcome = tokio::task::spawn_blocking(move || monitor.export(&path))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))??;

    let (status, rows) = match outcome {
        ExportOutcome::Written { rows } => ("written", rows),
        ExportOutcome::Skipped => ("skipped", 0),
    };
    Ok(Json(ExportResponse {
        status,
        rows,
        path: state.export_path.display().to_string(),
    }))
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    metrics::update_report_metrics(&state.monitor.report());
    metrics::update_ingest_metrics(&state.stats.snapshot());
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        metrics::encode_metrics(),
    )
}
