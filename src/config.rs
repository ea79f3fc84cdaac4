use crate::error::{OpenProxyError, Result};
use crate::source::defaults::DEFAULT_USER_AGENT;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Proxy factory configuration
    pub factory: FactoryConfig,
    /// API server configuration
    pub api: ApiServerConfig,
    /// Logging configuration
    pub log: LogConfig,
}

/// Settings for the proxy factory and the streams it opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Register the built-in sources on startup
    pub default_sources: bool,
    /// Fixed seed for the per-stream shuffle; random when unset
    pub shuffle_seed: Option<u64>,
    /// Upper bound for a single source fetch; unbounded when unset
    pub source_timeout: Option<Duration>,
    /// Capacity of the output channel (1 = hand-off)
    pub stream_buffer: usize,
    /// Log each failing source at warn level instead of debug
    pub log_source_failures: bool,
    /// Request timeout for the built-in HTTP sources
    pub http_timeout: Duration,
    /// User agent for the built-in HTTP sources
    pub user_agent: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            default_sources: true,
            shuffle_seed: None,
            source_timeout: None,
            stream_buffer: 1,
            log_source_failures: true,
            http_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port for the API server (default: 8001)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let stream_buffer: usize = get_env_or("OPENPROXY_STREAM_BUFFER", "1")
            .parse()
            .map_err(|_| {
                OpenProxyError::InvalidConfig(
                    "OPENPROXY_STREAM_BUFFER must be a valid number".into(),
                )
            })?;
        if stream_buffer == 0 {
            return Err(OpenProxyError::InvalidConfig(
                "OPENPROXY_STREAM_BUFFER must be at least 1".into(),
            ));
        }

        let shuffle_seed = match env::var("OPENPROXY_SHUFFLE_SEED") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                OpenProxyError::InvalidConfig("OPENPROXY_SHUFFLE_SEED must be a u64".into())
            })?),
            _ => None,
        };

        let source_timeout_secs: u64 = get_env_or("OPENPROXY_SOURCE_TIMEOUT", "0")
            .parse()
            .map_err(|_| {
                OpenProxyError::InvalidConfig(
                    "OPENPROXY_SOURCE_TIMEOUT must be a number of seconds".into(),
                )
            })?;

        Ok(Config {
            factory: FactoryConfig {
                default_sources: get_env_or("OPENPROXY_DEFAULT_SOURCES", "true")
                    .parse()
                    .unwrap_or(true),
                shuffle_seed,
                source_timeout: (source_timeout_secs > 0)
                    .then(|| Duration::from_secs(source_timeout_secs)),
                stream_buffer,
                log_source_failures: get_env_or("OPENPROXY_LOG_SOURCE_FAILURES", "true")
                    .parse()
                    .unwrap_or(true),
                http_timeout: Duration::from_secs(
                    get_env_or("OPENPROXY_HTTP_TIMEOUT", "10")
                        .parse()
                        .unwrap_or(10),
                ),
                user_agent: get_env_or("OPENPROXY_USER_AGENT", DEFAULT_USER_AGENT),
            },
            api: ApiServerConfig {
                port: get_env_or("API_PORT", "8001").parse().map_err(|_| {
                    OpenProxyError::InvalidConfig("API_PORT must be a valid port number".into())
                })?,
                host: get_env_or("API_HOST", "0.0.0.0"),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Get the API server address
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "OPENPROXY_DEFAULT_SOURCES",
        "OPENPROXY_SHUFFLE_SEED",
        "OPENPROXY_SOURCE_TIMEOUT",
        "OPENPROXY_STREAM_BUFFER",
        "OPENPROXY_LOG_SOURCE_FAILURES",
        "OPENPROXY_HTTP_TIMEOUT",
        "OPENPROXY_USER_AGENT",
        "API_PORT",
        "API_HOST",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let config = Config::from_env().unwrap();

        assert_eq!(config.factory, FactoryConfig::default());
        assert_eq!(config.api.port, 8001);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "pretty");
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("OPENPROXY_DEFAULT_SOURCES", "false");
        env::set_var("OPENPROXY_SHUFFLE_SEED", "42");
        env::set_var("OPENPROXY_SOURCE_TIMEOUT", "15");
        env::set_var("OPENPROXY_STREAM_BUFFER", "8");
        env::set_var("OPENPROXY_LOG_SOURCE_FAILURES", "false");
        env::set_var("API_PORT", "9001");
        env::set_var("API_HOST", "127.0.0.1");
        env::set_var("LOG_FORMAT", "json");

        let config = Config::from_env().unwrap();

        assert!(!config.factory.default_sources);
        assert_eq!(config.factory.shuffle_seed, Some(42));
        assert_eq!(config.factory.source_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.factory.stream_buffer, 8);
        assert!(!config.factory.log_source_failures);
        assert_eq!(config.api_addr(), "127.0.0.1:9001");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_config_from_env_invalid_port() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("API_PORT", "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, OpenProxyError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_env_invalid_seed() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("OPENPROXY_SHUFFLE_SEED", "-1");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, OpenProxyError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_env_zero_buffer() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("OPENPROXY_STREAM_BUFFER", "0");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, OpenProxyError::InvalidConfig(_)));
    }
}
