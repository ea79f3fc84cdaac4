//! Scraper for HTML pages listing proxies in a table

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, instrument};

use super::SourceParser;
use crate::error::{OpenProxyError, Result};
use crate::models::ProxyEndpoint;

/// Table sites list plain HTTP proxies
const TABLE_SCHEME: &str = "http";

/// Matches an IPv4 cell immediately followed by a port cell
fn row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?is)<td[^>]*>\s*(\d{1,3}(?:\.\d{1,3}){3})\s*</td>\s*<td[^>]*>\s*(\d{1,5})\s*</td>",
        )
        .expect("row pattern is valid")
    })
}

/// Extract `scheme://ip:port` endpoints from table rows.
///
/// Rows whose address does not parse are skipped.
pub fn extract_table_rows(html: &str, scheme: &str) -> Vec<ProxyEndpoint> {
    row_pattern()
        .captures_iter(html)
        .filter_map(|caps| ProxyEndpoint::from_parts(scheme, &caps[1], &caps[2]).ok())
        .collect()
}

/// Parser for sites that publish proxies as `<td>IP</td><td>PORT</td>` rows
#[derive(Clone)]
pub struct HtmlTableParser {
    client: Client,
    name: String,
}

impl HtmlTableParser {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

#[async_trait]
impl SourceParser for HtmlTableParser {
    #[instrument(skip(self), fields(parser = %self.name))]
    async fn parse(&self, source: &str) -> Result<Vec<ProxyEndpoint>> {
        let response = self
            .client
            .get(source)
            .send()
            .await
            .map_err(|e| OpenProxyError::source_fetch(source, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpenProxyError::source_fetch(
                source,
                format!("unexpected status {}", status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OpenProxyError::source_fetch(source, e))?;

        let endpoints = extract_table_rows(&body, TABLE_SCHEME);
        debug!("Scraped {} rows from {}", endpoints.len(), source);
        Ok(endpoints)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <table id="proxylisttable">
          <tbody>
            <tr><td>203.0.113.5</td><td>8080</td><td>US</td><td>anonymous</td></tr>
            <tr>
              <td class="tdl">198.51.100.23</td>
              <td>3128</td>
              <td>DE</td>
            </tr>
            <tr><td>not-an-ip</td><td>80</td></tr>
            <tr><td>192.0.2.1</td><td>70000</td></tr>
          </tbody>
        </table>
    "#;

    #[test]
    fn test_extract_table_rows() {
        let endpoints = extract_table_rows(PAGE, "http");
        let rendered: Vec<String> = endpoints.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["http://203.0.113.5:8080", "http://198.51.100.23:3128"]
        );
    }

    #[test]
    fn test_extract_table_rows_with_scheme() {
        let endpoints = extract_table_rows(PAGE, "socks5");
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints.iter().all(|e| e.scheme() == "socks5"));
    }

    #[test]
    fn test_extract_table_rows_empty_page() {
        assert!(extract_table_rows("<html><body>blocked</body></html>", "http").is_empty());
    }
}
