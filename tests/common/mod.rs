//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use relay_proxy::config::ServerConfig;
use relay_proxy::http::{self, RelayServer, ServerError};
use relay_proxy::lifecycle::{LifecycleState, Shutdown};
use relay_proxy::outbound::OutboundStrategy;
use relay_proxy::relay::{self, RelayState, RelayTimeouts, UpstreamTarget};

/// Serve `router` as a mock upstream on an ephemeral port.
pub async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A running relay and the handles needed to drive and observe it.
pub struct RelayHandle {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), ServerError>>,
    pub state: watch::Receiver<LifecycleState>,
}

impl RelayHandle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn test_timeouts() -> RelayTimeouts {
    RelayTimeouts::from_config(&ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        read_header_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(5),
        idle_timeout: Duration::from_secs(30),
    })
}

/// Start a relay on an ephemeral port, forwarding to `upstream_url` with
/// direct dialing, and wait until it reports `Serving`.
pub async fn spawn_relay(upstream_url: &str) -> RelayHandle {
    spawn_relay_with_grace(upstream_url, None).await
}

/// Like [`spawn_relay`], with the drain grace period shortened so drain
/// overruns can be provoked without waiting out the default.
pub async fn spawn_relay_with_grace(upstream_url: &str, grace: Option<Duration>) -> RelayHandle {
    let timeouts = test_timeouts();
    let upstream = UpstreamTarget::parse(upstream_url).unwrap();
    let client = relay::assemble(OutboundStrategy::Direct, &timeouts).unwrap();
    let state = Arc::new(RelayState {
        client,
        upstream,
        request_timeout: timeouts.request,
    });

    let mut server = RelayServer::new(state, &timeouts);
    if let Some(grace) = grace {
        server = server.with_grace_period(grace);
    }
    let mut state_watch = server.state_watch();

    let listener = http::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    let task = tokio::spawn(server.run(listener, shutdown_rx));

    state_watch
        .wait_for(|state| *state == LifecycleState::Serving)
        .await
        .unwrap();

    RelayHandle {
        addr,
        shutdown,
        task,
        state: state_watch,
    }
}

/// A client that ignores proxy environment variables and connection reuse
/// surprises from earlier tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}
