//! Proxy factory
//!
//! Holds the registry of [`ProxyBuilder`]s and turns it into proxy streams.
//! Each stream runs a two-phase pipeline in a background task:
//!
//! - `Fetching`: every source is parsed concurrently and the results are
//!   merged into one snapshot
//! - `Rotating`: the snapshot is shuffled once and replayed cyclically

mod fetch;
mod rotation;
mod stream;

pub use stream::ProxyStream;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use reqwest::Client;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::FactoryConfig;
use crate::error::{OpenProxyError, Result};
use crate::models::{FetchReport, ProxyEndpoint, StreamState};
use crate::source::{self, ProxyBuilder};

use fetch::{FetchOptions, SourceJob};
use rotation::Rotation;

/// Registry of proxy sources and entry point for opening streams
pub struct ProxyFactory {
    builders: Vec<ProxyBuilder>,
    config: FactoryConfig,
    client: Option<Client>,
}

impl ProxyFactory {
    /// Create a factory with an empty registry
    pub fn new() -> Self {
        Self::with_config(FactoryConfig::default())
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        Self {
            builders: Vec::new(),
            config,
            client: None,
        }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Registered builders, in registration order
    pub fn builders(&self) -> &[ProxyBuilder] {
        &self.builders
    }

    /// Total number of sources across all builders
    pub fn source_count(&self) -> usize {
        self.builders.iter().map(|b| b.sources().len()).sum()
    }

    /// Append the built-in sources.
    ///
    /// Nothing is fetched here; the only failure is building the HTTP client.
    pub fn add_default_sources(&mut self) -> Result<()> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => {
                let client =
                    source::http_client(self.config.http_timeout, &self.config.user_agent)?;
                self.client = Some(client.clone());
                client
            }
        };

        let defaults = source::default_builders(&client);
        info!("Registered {} default proxy builders", defaults.len());
        self.builders.extend(defaults);
        Ok(())
    }

    /// Append a caller-provided builder.
    ///
    /// A builder without a parser or without sources is rejected with
    /// [`OpenProxyError::Configuration`] and not registered.
    pub fn add_custom_source(&mut self, builder: ProxyBuilder) -> Result<()> {
        builder.validate()?;
        self.builders.push(builder);
        Ok(())
    }

    /// Open a new stream over every registered source.
    ///
    /// Returns immediately; fetching happens in a background task on the
    /// current Tokio runtime. The shuffle uses `shuffle_seed` when configured.
    pub fn open_stream(&self) -> Result<ProxyStream> {
        let rng = match self.config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.open_stream_with_rng(rng)
    }

    /// Open a new stream whose shuffle is driven by `rng`
    pub fn open_stream_with_rng<R>(&self, rng: R) -> Result<ProxyStream>
    where
        R: RngCore + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| {
            OpenProxyError::Configuration(
                "proxy streams must be opened from within a Tokio runtime".into(),
            )
        })?;

        let jobs = fetch::jobs(&self.builders);
        if jobs.is_empty() {
            return Err(OpenProxyError::EmptyResult);
        }

        let id = Uuid::new_v4();
        let (output_tx, output_rx) = mpsc::channel(self.config.stream_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(StreamState::Fetching);
        let (report_tx, report_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let options = FetchOptions {
            source_timeout: self.config.source_timeout,
            log_source_failures: self.config.log_source_failures,
        };

        runtime.spawn(run_stream(
            id,
            jobs,
            options,
            rng,
            output_tx,
            state_tx,
            report_tx,
            shutdown_rx,
        ));

        Ok(ProxyStream::new(
            id,
            output_rx,
            state_rx,
            report_rx,
            shutdown_tx,
        ))
    }
}

impl Default for ProxyFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Background driver for one stream: `Fetching` -> `Rotating`
#[instrument(skip_all, fields(stream_id = %id))]
async fn run_stream<R: RngCore>(
    id: Uuid,
    jobs: Vec<SourceJob>,
    options: FetchOptions,
    mut rng: R,
    output: mpsc::Sender<Result<ProxyEndpoint>>,
    state: watch::Sender<StreamState>,
    report_tx: watch::Sender<Option<FetchReport>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let fetched = tokio::select! {
        biased;
        _ = shutdown.changed() => None,
        fetched = fetch::collect(jobs, options) => Some(fetched),
    };

    let Some((snapshot, report)) = fetched else {
        info!("Stream closed while fetching");
        state.send_replace(StreamState::Closed);
        return;
    };

    // Published before the state so a settled observer always sees it.
    report_tx.send_replace(Some(report.clone()));

    match Rotation::new(snapshot, &mut rng) {
        Ok(rotation) => {
            info!("Rotating {} proxies", rotation.len());
            state.send_replace(StreamState::Rotating {
                snapshot_size: rotation.len(),
                failed_sources: report.failed_sources,
            });
            rotation.run(&output, &mut shutdown).await;
            state.send_replace(StreamState::Closed);
            info!("Stream closed");
        }
        Err(e) => {
            warn!(
                "No proxies collected from {} sources ({} failed)",
                report.sources, report.failed_sources
            );
            state.send_replace(StreamState::Empty);
            let _ = output.send(Err(e)).await;
        }
    }
}
