//! API server using Axum

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::ApiServerConfig;
use crate::error::{OpenProxyError, Result};
use crate::factory::{ProxyFactory, ProxyStream};
use crate::models::{FetchReport, StreamState};
use crate::source::ProxyBuilder;

use super::routes;

/// One registered builder as listed by the API
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub parser: String,
    pub sources: Vec<String>,
}

impl From<&ProxyBuilder> for SourceSummary {
    fn from(builder: &ProxyBuilder) -> Self {
        Self {
            parser: builder.parser_name().to_string(),
            sources: builder.sources().to_vec(),
        }
    }
}

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// The stream every request pulls from
    pub stream: Arc<Mutex<ProxyStream>>,
    pub stream_state: watch::Receiver<StreamState>,
    pub fetch_report: watch::Receiver<Option<FetchReport>>,
    pub sources: Arc<Vec<SourceSummary>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(factory: &ProxyFactory, stream: ProxyStream) -> Self {
        Self {
            stream_state: stream.subscribe_state(),
            fetch_report: stream.subscribe_report(),
            stream: Arc::new(Mutex::new(stream)),
            sources: Arc::new(factory.builders().iter().map(SourceSummary::from).collect()),
            started_at: Instant::now(),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                OpenProxyError::InvalidConfig(format!(
                    "invalid API address {}:{}",
                    self.config.host, self.config.port
                ))
            })?;

        let router = self.build_router();

        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| OpenProxyError::Internal(e.to_string()))?;

        info!("API server shut down");
        Ok(())
    }
}
