//! Health check endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "openproxy"
        })),
    )
}

/// Stream lifecycle, last fetch outcome and uptime
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let stream_state = state.stream_state.borrow().clone();
    let fetch = state.fetch_report.borrow().clone().map(|report| {
        json!({
            "sources": report.sources,
            "succeeded_sources": report.succeeded_sources(),
            "failed_sources": report.failed_sources,
            "endpoints": report.endpoints,
            "completed_at": report.completed_at,
        })
    });

    Json(json!({
        "stream": stream_state,
        "fetch": fetch,
        "builders": state.sources.len(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}
