//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce required fields (listen address, upstream URL)
//! - Substitute timeout defaults for unset fields
//!
//! # Design Decisions
//! - An absent `[outbound]` section (or absent `mode`) means direct dialing;
//!   `host`/`port` are only required once a mode is chosen
//! - Validation runs once at load; everything downstream trusts the result

use std::time::Duration;

use crate::config::loader::ConfigError;
use crate::config::schema::RelayConfig;

const DEFAULT_READ_HEADER_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Validate the configuration in place, filling in defaults.
pub fn validate(config: &mut RelayConfig) -> Result<(), ConfigError> {
    if config.server.listen_addr.is_empty() {
        return Err(ConfigError::invalid("server.listen_addr is required"));
    }
    if config.upstream.url.is_empty() {
        return Err(ConfigError::invalid("upstream.url is required"));
    }

    if let Some(mode) = config.outbound.mode.as_deref() {
        match mode {
            "http" | "https" | "socks5" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unsupported outbound.mode: {other:?}"
                )));
            }
        }
        if config.outbound.host.is_empty() || config.outbound.port == 0 {
            return Err(ConfigError::invalid(
                "outbound.host and outbound.port are required when outbound.mode is set",
            ));
        }
    }

    if config.server.read_header_timeout.is_zero() {
        config.server.read_header_timeout = DEFAULT_READ_HEADER_TIMEOUT;
    }
    if config.server.request_timeout.is_zero() {
        config.server.request_timeout = DEFAULT_REQUEST_TIMEOUT;
    }
    if config.server.idle_timeout.is_zero() {
        config.server.idle_timeout = DEFAULT_IDLE_TIMEOUT;
    }

    if config.observability.log_level.is_empty() {
        config.observability.log_level = "info".to_string();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.server.listen_addr = "127.0.0.1:8080".to_string();
        config.upstream.url = "https://registry.example.com".to_string();
        config
    }

    #[test]
    fn requires_listen_addr() {
        let mut config = minimal();
        config.server.listen_addr.clear();
        assert!(validate(&mut config).is_err());
    }

    #[test]
    fn requires_upstream_url() {
        let mut config = minimal();
        config.upstream.url.clear();
        assert!(validate(&mut config).is_err());
    }

    #[test]
    fn no_outbound_section_is_valid() {
        let mut config = minimal();
        validate(&mut config).unwrap();
        assert!(config.outbound.mode.is_none());
    }

    #[test]
    fn mode_requires_host_and_port() {
        let mut config = minimal();
        config.outbound.mode = Some("socks5".to_string());
        assert!(validate(&mut config).is_err());

        config.outbound.host = "127.0.0.1".to_string();
        assert!(validate(&mut config).is_err());

        config.outbound.port = 7890;
        validate(&mut config).unwrap();
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut config = minimal();
        config.outbound.mode = Some("quic".to_string());
        config.outbound.host = "127.0.0.1".to_string();
        config.outbound.port = 7890;
        assert!(validate(&mut config).is_err());
    }

    #[test]
    fn substitutes_timeout_defaults() {
        let mut config = minimal();
        validate(&mut config).unwrap();
        assert_eq!(config.server.read_header_timeout, Duration::from_secs(5));
        assert_eq!(config.server.request_timeout, Duration::from_secs(60));
        assert_eq!(config.server.idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn keeps_explicit_timeouts() {
        let mut config = minimal();
        config.server.request_timeout = Duration::from_secs(7);
        validate(&mut config).unwrap();
        assert_eq!(config.server.request_timeout, Duration::from_secs(7));
    }
}
