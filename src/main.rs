//! OpenProxy - Entry Point
//!
//! Builds the proxy factory, opens one stream and serves it over HTTP until
//! a shutdown signal arrives.

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use openproxy::api::{ApiServer, AppState};
use openproxy::config::LogConfig;
use openproxy::{Config, ProxyFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("failed to load configuration")?;

    init_tracing(&config.log);
    info!("Starting OpenProxy");

    // Register sources
    let mut factory = ProxyFactory::with_config(config.factory.clone());
    if config.factory.default_sources {
        factory
            .add_default_sources()
            .context("failed to register default sources")?;
    }
    info!(
        "Registered {} builders with {} sources",
        factory.builders().len(),
        factory.source_count()
    );

    // Fetching starts in the background right away
    let stream = factory
        .open_stream()
        .context("failed to open proxy stream")?;
    info!("Opened proxy stream {}", stream.id());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let api_server = ApiServer::new(config.api.clone(), AppState::new(&factory, stream));
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(shutdown_rx).await {
            error!("API server error: {}", e);
        }
    });

    info!("API server started on {}", config.api_addr());

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    let _ = api_task.await;

    info!("OpenProxy stopped");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("openproxy={},tower_http=info", log.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
