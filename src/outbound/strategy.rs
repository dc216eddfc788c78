//! Outbound dialing strategy.
//!
//! The strategy is resolved exactly once from validated configuration into a
//! closed variant. Unsupported modes and missing endpoint parameters are
//! rejected here, at startup; dialing never re-validates.

use std::fmt;

use crate::config::{ConfigError, OutboundConfig};

/// Scheme used to reach an HTTP forward proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyScheme {
    Http,
    Https,
}

/// How upstream TCP connections are established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundStrategy {
    /// Dial the target directly.
    Direct,

    /// Dial an HTTP forward proxy and tunnel through it with CONNECT.
    HttpProxy {
        scheme: ProxyScheme,
        host: String,
        port: u16,
    },

    /// Perform a SOCKS5 handshake with the proxy, then relay to the target.
    /// No authentication credentials supported.
    Socks5 { host: String, port: u16 },
}

impl OutboundStrategy {
    /// Resolve the strategy from validated configuration.
    ///
    /// An absent `mode` means direct dialing. This re-checks host/port so the
    /// invariant holds even for callers that construct `OutboundConfig`
    /// directly instead of going through the loader.
    pub fn from_config(config: &OutboundConfig) -> Result<Self, ConfigError> {
        let Some(mode) = config.mode.as_deref() else {
            return Ok(OutboundStrategy::Direct);
        };

        if config.host.is_empty() || config.port == 0 {
            return Err(ConfigError::invalid(
                "outbound.host and outbound.port are required when outbound.mode is set",
            ));
        }

        match mode {
            "http" => Ok(OutboundStrategy::HttpProxy {
                scheme: ProxyScheme::Http,
                host: config.host.clone(),
                port: config.port,
            }),
            "https" => Ok(OutboundStrategy::HttpProxy {
                scheme: ProxyScheme::Https,
                host: config.host.clone(),
                port: config.port,
            }),
            "socks5" => Ok(OutboundStrategy::Socks5 {
                host: config.host.clone(),
                port: config.port,
            }),
            other => Err(ConfigError::Invalid(format!(
                "unsupported outbound.mode: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for OutboundStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundStrategy::Direct => write!(f, "direct"),
            OutboundStrategy::HttpProxy {
                scheme: ProxyScheme::Http,
                host,
                port,
            } => write!(f, "http://{host}:{port}"),
            OutboundStrategy::HttpProxy {
                scheme: ProxyScheme::Https,
                host,
                port,
            } => write!(f, "https://{host}:{port}"),
            OutboundStrategy::Socks5 { host, port } => write!(f, "socks5://{host}:{port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbound(mode: Option<&str>, host: &str, port: u16) -> OutboundConfig {
        OutboundConfig {
            mode: mode.map(str::to_string),
            host: host.to_string(),
            port,
        }
    }

    #[test]
    fn absent_mode_is_direct() {
        let strategy = OutboundStrategy::from_config(&outbound(None, "", 0)).unwrap();
        assert_eq!(strategy, OutboundStrategy::Direct);
    }

    #[test]
    fn http_and_https_modes() {
        let strategy =
            OutboundStrategy::from_config(&outbound(Some("http"), "proxy.local", 3128)).unwrap();
        assert_eq!(
            strategy,
            OutboundStrategy::HttpProxy {
                scheme: ProxyScheme::Http,
                host: "proxy.local".to_string(),
                port: 3128,
            }
        );

        let strategy =
            OutboundStrategy::from_config(&outbound(Some("https"), "proxy.local", 3129)).unwrap();
        assert!(matches!(
            strategy,
            OutboundStrategy::HttpProxy {
                scheme: ProxyScheme::Https,
                ..
            }
        ));
    }

    #[test]
    fn socks5_mode() {
        let strategy =
            OutboundStrategy::from_config(&outbound(Some("socks5"), "127.0.0.1", 7890)).unwrap();
        assert_eq!(
            strategy,
            OutboundStrategy::Socks5 {
                host: "127.0.0.1".to_string(),
                port: 7890,
            }
        );
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(OutboundStrategy::from_config(&outbound(Some("quic"), "h", 1)).is_err());
    }

    #[test]
    fn rejects_missing_endpoint() {
        assert!(OutboundStrategy::from_config(&outbound(Some("http"), "", 3128)).is_err());
        assert!(OutboundStrategy::from_config(&outbound(Some("http"), "proxy", 0)).is_err());
    }
}
