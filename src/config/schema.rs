//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every struct
//! carries `#[serde(default)]` so a config file only needs the fields it
//! wants to override; required fields are enforced in validation, not here.

use std::time::Duration;

use serde::Deserialize;

use crate::config::duration;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener and timeout settings.
    pub server: ServerConfig,

    /// Upstream the relay forwards every request to.
    pub upstream: UpstreamConfig,

    /// Optional outbound forward-proxy settings.
    pub outbound: OutboundConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). Required.
    pub listen_addr: String,

    /// Time allowed for a client to send request headers. Default 5s.
    #[serde(deserialize_with = "duration::deserialize")]
    pub read_header_timeout: Duration,

    /// Budget for one upstream exchange (connect through response headers).
    /// Default 60s.
    #[serde(deserialize_with = "duration::deserialize")]
    pub request_timeout: Duration,

    /// How long pooled upstream connections may sit idle. Default 90s.
    #[serde(deserialize_with = "duration::deserialize")]
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: String::new(),
            read_header_timeout: Duration::ZERO,
            request_timeout: Duration::ZERO,
            idle_timeout: Duration::ZERO,
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL all inbound requests are remapped onto (scheme + host).
    /// Required.
    pub url: String,
}

/// Outbound forward-proxy configuration.
///
/// Leaving the section (or `mode`) out means upstream connections are dialed
/// directly. When `mode` is set, `host` and `port` are required.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutboundConfig {
    /// One of "http", "https", "socks5".
    pub mode: Option<String>,

    /// Forward-proxy host.
    pub host: String,

    /// Forward-proxy port.
    pub port: u16,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set.
    pub log_level: String,

    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
