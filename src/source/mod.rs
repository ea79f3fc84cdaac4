//! Proxy sources
//!
//! A source is any addressable origin (usually a URL) that a parser can turn
//! into proxy endpoints. Sources sharing a parser are grouped in a
//! [`ProxyBuilder`].

pub mod defaults;
mod html;
mod json;

pub use defaults::{default_builders, http_client};
pub use html::HtmlTableParser;
pub use json::JsonApiParser;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{OpenProxyError, Result};
use crate::models::ProxyEndpoint;

/// Trait for turning one source into proxy endpoints
///
/// Implementations report ordinary fetch and parse failures as
/// [`OpenProxyError::SourceFetch`]; the aggregator treats any error as an
/// empty contribution and carries on with the other sources.
#[async_trait]
pub trait SourceParser: Send + Sync {
    /// Fetch and parse a single source
    async fn parse(&self, source: &str) -> Result<Vec<ProxyEndpoint>>;

    /// Human readable parser name, used in logs and listings
    fn name(&self) -> &str;
}

/// Adapts an async closure into a [`SourceParser`]
pub struct FnParser<F> {
    name: String,
    f: F,
}

impl<F> FnParser<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> SourceParser for FnParser<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<ProxyEndpoint>>> + Send + 'static,
{
    async fn parse(&self, source: &str) -> Result<Vec<ProxyEndpoint>> {
        (self.f)(source.to_string()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A group of sources that all use the same parser
#[derive(Clone)]
pub struct ProxyBuilder {
    sources: Vec<String>,
    parser: Option<Arc<dyn SourceParser>>,
}

impl ProxyBuilder {
    pub fn new<I, S>(sources: I, parser: impl SourceParser + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_shared_parser(sources, Arc::new(parser))
    }

    /// Build from a parser that is already shared with other builders
    pub fn with_shared_parser<I, S>(sources: I, parser: Arc<dyn SourceParser>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            parser: Some(parser),
        }
    }

    /// Sources only; a parser must be attached before registration succeeds
    pub fn without_parser<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            parser: None,
        }
    }

    pub fn with_parser(mut self, parser: impl SourceParser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn parser(&self) -> Option<&Arc<dyn SourceParser>> {
        self.parser.as_ref()
    }

    pub fn parser_name(&self) -> &str {
        self.parser.as_deref().map_or("<none>", |p| p.name())
    }

    /// Check that the builder can be registered
    pub fn validate(&self) -> Result<()> {
        if self.parser.is_none() {
            return Err(OpenProxyError::Configuration(format!(
                "builder for {} source(s) has no parser",
                self.sources.len()
            )));
        }
        if self.sources.is_empty() {
            return Err(OpenProxyError::Configuration(format!(
                "builder with parser {} has no sources",
                self.parser_name()
            )));
        }
        if let Some(blank) = self.sources.iter().position(|s| s.trim().is_empty()) {
            return Err(OpenProxyError::Configuration(format!(
                "source #{} of parser {} is blank",
                blank,
                self.parser_name()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ProxyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyBuilder")
            .field("sources", &self.sources)
            .field("parser", &self.parser_name())
            .finish()
    }
}
