//! Proxy stream handlers

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::server::AppState;
use crate::error::OpenProxyError;

const MAX_BATCH: usize = 1000;

/// Query parameters for pulling several proxies
#[derive(Debug, Deserialize, Default)]
pub struct TakeProxiesQuery {
    pub count: Option<usize>,
}

/// Pull the next proxy off the shared stream
pub async fn next_proxy(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, OpenProxyError> {
    let proxy = state.stream.lock().await.next_proxy().await?;
    Ok(Json(json!({ "proxy": proxy })))
}

/// Pull the next `count` proxies (default 10)
pub async fn take_proxies(
    State(state): State<AppState>,
    Query(query): Query<TakeProxiesQuery>,
) -> Result<impl IntoResponse, OpenProxyError> {
    let count = query.count.unwrap_or(10);
    if count == 0 || count > MAX_BATCH {
        return Err(OpenProxyError::InvalidRequest(format!(
            "count must be between 1 and {}",
            MAX_BATCH
        )));
    }

    let mut stream = state.stream.lock().await;
    let mut proxies = Vec::with_capacity(count);
    for _ in 0..count {
        proxies.push(stream.next_proxy().await?);
    }

    Ok(Json(json!({ "proxies": proxies })))
}

/// List the registered builders and their sources
pub async fn list_sources(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "builders": state.sources.as_ref() }))
}
