//! Forwarding transport assembly.
//!
//! One pooled HTTP client is built at startup and shared by every relay task
//! for the process lifetime; per-request transport construction would defeat
//! connection reuse. Connections open lazily on first use.

use std::time::Duration;

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::config::{ConfigError, ServerConfig};
use crate::outbound::{OutboundStrategy, RelayConnector};

/// Upper bound on pooled idle connections per upstream host.
const MAX_IDLE_CONNECTIONS: usize = 100;

/// The shared client used for every upstream call.
pub type ForwardingClient = Client<HttpsConnector<RelayConnector>, Body>;

/// Timeout budget for the forwarding pipeline, derived once from validated
/// configuration. All values are non-negative; the fixed members follow the
/// transport defaults we have always run with.
#[derive(Debug, Clone, Copy)]
pub struct RelayTimeouts {
    /// Bound on establishing one upstream connection (including any proxy
    /// handshake).
    pub connect: Duration,

    /// Bound on one upstream exchange, send through response headers.
    pub request: Duration,

    /// Pooled connections idle longer than this are closed.
    pub idle: Duration,

    /// Time allowed for an inbound client to send its request headers.
    pub read_header: Duration,

    /// TCP keepalive probe interval for outbound sockets.
    pub keepalive_interval: Duration,

    /// Bound on the TLS handshake with an `https` forward proxy.
    pub tls_handshake: Duration,
}

impl RelayTimeouts {
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            connect: server.request_timeout,
            request: server.request_timeout,
            idle: server.idle_timeout,
            read_header: server.read_header_timeout,
            keepalive_interval: Duration::from_secs(30),
            tls_handshake: Duration::from_secs(10),
        }
    }
}

/// Build the forwarding client over the dial function for `strategy`.
///
/// ALPN advertises h2 and http/1.1 so upstreams that speak HTTP/2 get a
/// multiplexed connection; plain-http upstreams stay on HTTP/1.1.
pub fn assemble(
    strategy: OutboundStrategy,
    timeouts: &RelayTimeouts,
) -> Result<ForwardingClient, ConfigError> {
    let connector = RelayConnector::new(strategy, timeouts)?;
    let connector = HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|err| ConfigError::Invalid(format!("load native TLS roots: {err}")))?
        .https_or_http()
        .enable_all_versions()
        .wrap_connector(connector);

    Ok(Client::builder(TokioExecutor::new())
        .pool_idle_timeout(timeouts.idle)
        .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
        .pool_timer(TokioTimer::new())
        .build(connector))
}
