//! Parser for JSON APIs returning a list of proxy records

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::SourceParser;
use crate::error::{OpenProxyError, Result};
use crate::models::ProxyEndpoint;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortField {
    Number(u16),
    Text(String),
}

/// One record as published by the API
#[derive(Debug, Deserialize)]
struct ProxyRecord {
    #[serde(alias = "IP", alias = "Ip")]
    ip: String,
    #[serde(alias = "Port")]
    port: PortField,
    #[serde(rename = "type", alias = "Type", default)]
    kind: Option<String>,
}

impl ProxyRecord {
    fn into_endpoint(self, default_scheme: &str) -> Option<ProxyEndpoint> {
        let port = match self.port {
            PortField::Number(p) => p.to_string(),
            PortField::Text(p) => p,
        };
        let scheme = self
            .kind
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| default_scheme.to_string());
        ProxyEndpoint::from_parts(&scheme, &self.ip, &port).ok()
    }
}

/// Decode a JSON array of `{ip, port, type}` records.
///
/// Records that do not form a valid endpoint are dropped.
pub fn decode_records(body: &[u8], default_scheme: &str) -> Result<Vec<ProxyEndpoint>> {
    let records: Vec<ProxyRecord> = serde_json::from_slice(body)
        .map_err(|e| OpenProxyError::InvalidEndpoint(format!("malformed proxy list: {}", e)))?;

    Ok(records
        .into_iter()
        .filter_map(|r| r.into_endpoint(default_scheme))
        .collect())
}

/// Parser for JSON proxy APIs
#[derive(Clone)]
pub struct JsonApiParser {
    client: Client,
    name: String,
}

impl JsonApiParser {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

#[async_trait]
impl SourceParser for JsonApiParser {
    #[instrument(skip(self), fields(parser = %self.name))]
    async fn parse(&self, source: &str) -> Result<Vec<ProxyEndpoint>> {
        let response = self
            .client
            .get(source)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OpenProxyError::source_fetch(source, e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| OpenProxyError::source_fetch(source, e))?;

        let endpoints = decode_records(&body, "http")
            .map_err(|e| OpenProxyError::source_fetch(source, e))?;
        debug!("Decoded {} records from {}", endpoints.len(), source);
        Ok(endpoints)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_records() {
        let body = br#"[
            {"ip": "203.0.113.9", "port": "8080", "type": "HTTP"},
            {"IP": "198.51.100.4", "Port": 443, "Type": "HTTPS"},
            {"ip": "192.0.2.8", "port": 3128}
        ]"#;

        let endpoints = decode_records(body, "http").unwrap();
        let rendered: Vec<String> = endpoints.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "http://203.0.113.9:8080",
                "https://198.51.100.4:443",
                "http://192.0.2.8:3128",
            ]
        );
    }

    #[test]
    fn test_decode_skips_invalid_records() {
        let body = br#"[
            {"ip": "203.0.113.9", "port": "not-a-port", "type": "HTTP"},
            {"ip": "", "port": 80, "type": "HTTP"},
            {"ip": "192.0.2.8", "port": 3128, "type": "socks5"}
        ]"#;

        let endpoints = decode_records(body, "http").unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].to_string(), "socks5://192.0.2.8:3128");
    }

    #[test]
    fn test_decode_malformed_body() {
        assert!(decode_records(b"<html>rate limited</html>", "http").is_err());
        assert!(decode_records(b"[]", "http").unwrap().is_empty());
    }
}
