//! OpenProxy - open proxy list aggregator
//!
//! Collects proxy endpoints from many independent sources and serves them as
//! one endless, shuffled, round-robin stream.
//!
//! ## Features
//!
//! - Pluggable sources: any [`SourceParser`] paired with a list of URLs
//! - Built-in scrapers for public HTML proxy tables and a JSON proxy API
//! - Concurrent fetch with per-source failure isolation and optional timeouts
//! - Reproducible shuffles through an injectable random source
//! - Cancellable streams with an observable `Fetching -> Rotating` lifecycle
//! - Small HTTP API serving the stream
//!
//! ```no_run
//! use futures::StreamExt;
//! use openproxy::ProxyFactory;
//!
//! # async fn run() -> openproxy::Result<()> {
//! let mut factory = ProxyFactory::new();
//! factory.add_default_sources()?;
//!
//! let mut stream = factory.open_stream()?;
//! while let Some(proxy) = stream.next().await {
//!     println!("{}", proxy?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod factory;
pub mod models;
pub mod source;

pub use config::{Config, FactoryConfig};
pub use error::{OpenProxyError, Result};
pub use factory::{ProxyFactory, ProxyStream};
pub use models::{FetchReport, ProxyEndpoint, ProxyProtocol, StreamState};
pub use source::{FnParser, ProxyBuilder, SourceParser};
