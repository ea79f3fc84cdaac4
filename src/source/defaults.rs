//! Built-in proxy list sources

use std::time::Duration;

use reqwest::Client;

use super::{HtmlTableParser, JsonApiParser, ProxyBuilder};
use crate::error::Result;

pub const DEFAULT_USER_AGENT: &str = concat!("openproxy/", env!("CARGO_PKG_VERSION"));

const INCLOAK_PAGES: usize = 11;
const INCLOAK_PAGE_SIZE: usize = 64;

const FREE_PROXY_LIST_SOURCES: &[&str] = &[
    "https://www.us-proxy.org/",
    "https://free-proxy-list.net/",
];

const NORDVPN_SOURCE: &str = concat!(
    "https://nordvpn.com/wp-admin/admin-ajax.php",
    "?searchParameters%5B2%5D%5Bname%5D=http&searchParameters%5B2%5D%5Bvalue%5D=on",
    "&searchParameters%5B3%5D%5Bname%5D=https&searchParameters%5B3%5D%5Bvalue%5D=on",
    "&offset=0&limit=10000&action=getProxies"
);

/// HTTP client shared by the built-in parsers
pub fn http_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .build()?)
}

fn incloak_sources() -> Vec<String> {
    (0..INCLOAK_PAGES)
        .map(|page| match page {
            0 => "https://incloak.com/proxy-list/?type=hs#list".to_string(),
            n => format!(
                "https://incloak.com/proxy-list/?type=hs&start={}#list",
                n * INCLOAK_PAGE_SIZE
            ),
        })
        .collect()
}

/// The built-in builders: two HTML proxy tables and one JSON API
pub fn default_builders(client: &Client) -> Vec<ProxyBuilder> {
    vec![
        ProxyBuilder::new(
            incloak_sources(),
            HtmlTableParser::new(client.clone(), "incloak"),
        ),
        ProxyBuilder::new(
            FREE_PROXY_LIST_SOURCES.iter().copied(),
            HtmlTableParser::new(client.clone(), "free-proxy-list"),
        ),
        ProxyBuilder::new([NORDVPN_SOURCE], JsonApiParser::new(client.clone(), "nordvpn")),
    ]
}
