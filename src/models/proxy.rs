use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use url::Url;

use crate::error::{OpenProxyError, Result};

/// Proxy protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks4 => "socks4",
            ProxyProtocol::Socks5 => "socks5",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            "socks4" => Some(ProxyProtocol::Socks4),
            "socks5" => Some(ProxyProtocol::Socks5),
            _ => None,
        }
    }
}

impl fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed proxy address: scheme, host and port.
///
/// The inner URL is shared, so cloning an endpoint off the rotation
/// snapshot never copies the address itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    url: Arc<Url>,
}

impl ProxyEndpoint {
    /// Parse an endpoint such as `http://1.2.3.4:8080`.
    ///
    /// The URL must carry a host and an explicit or scheme-default port.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())?;

        if url.host_str().map_or(true, str::is_empty) {
            return Err(OpenProxyError::InvalidEndpoint(format!(
                "{} has no host",
                input
            )));
        }
        if url.port_or_known_default().is_none() {
            return Err(OpenProxyError::InvalidEndpoint(format!(
                "{} has no port",
                input
            )));
        }

        Ok(Self { url: Arc::new(url) })
    }

    /// Build an endpoint from its parts, as scraped from a table row or a JSON record.
    pub fn from_parts(scheme: &str, host: &str, port: &str) -> Result<Self> {
        let port: u16 = port.trim().parse().map_err(|_| {
            OpenProxyError::InvalidEndpoint(format!("{:?} is not a valid port", port))
        })?;
        Self::parse(&format!(
            "{}://{}:{}",
            scheme.trim().to_lowercase(),
            host.trim(),
            port
        ))
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or_default()
    }

    /// Known protocol for the scheme, if any
    pub fn protocol(&self) -> Option<ProxyProtocol> {
        ProxyProtocol::from_str(self.scheme())
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme(), self.host(), self.port())
    }
}

impl Serialize for ProxyEndpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        let endpoint = ProxyEndpoint::parse("http://10.0.0.1:3128").unwrap();
        assert_eq!(endpoint.scheme(), "http");
        assert_eq!(endpoint.host(), "10.0.0.1");
        assert_eq!(endpoint.port(), 3128);
        assert_eq!(endpoint.protocol(), Some(ProxyProtocol::Http));
        assert_eq!(endpoint.to_string(), "http://10.0.0.1:3128");
    }

    #[test]
    fn test_parse_default_port() {
        // url drops the port when it matches the scheme default
        let endpoint = ProxyEndpoint::parse("http://10.0.0.1:80").unwrap();
        assert_eq!(endpoint.port(), 80);
        assert_eq!(endpoint.to_string(), "http://10.0.0.1:80");
    }

    #[test]
    fn test_parse_rejects_missing_port() {
        let err = ProxyEndpoint::parse("socks5://10.0.0.1").unwrap_err();
        assert!(matches!(err, OpenProxyError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ProxyEndpoint::parse("not a url").is_err());
        assert!(ProxyEndpoint::parse("").is_err());
    }

    #[test]
    fn test_from_parts_normalizes() {
        let endpoint = ProxyEndpoint::from_parts("HTTPS", " 192.168.1.7 ", "8443\n").unwrap();
        assert_eq!(endpoint.scheme(), "https");
        assert_eq!(endpoint.host(), "192.168.1.7");
        assert_eq!(endpoint.port(), 8443);
        assert_eq!(endpoint.protocol(), Some(ProxyProtocol::Https));
    }

    #[test]
    fn test_from_parts_rejects_bad_port() {
        assert!(ProxyEndpoint::from_parts("http", "1.2.3.4", "99999").is_err());
        assert!(ProxyEndpoint::from_parts("http", "1.2.3.4", "").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let endpoint = ProxyEndpoint::parse("socks5://1.2.3.4:1080").unwrap();
        assert_eq!(
            serde_json::to_string(&endpoint).unwrap(),
            "\"socks5://1.2.3.4:1080\""
        );
    }

    #[test]
    fn test_protocol_from_str() {
        assert_eq!(ProxyProtocol::from_str("SOCKS5"), Some(ProxyProtocol::Socks5));
        assert_eq!(ProxyProtocol::from_str("ftp"), None);
    }
}
