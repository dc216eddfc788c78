//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Build the Axum router (`/healthz` + relay fallback)
//! - Accept connections, one task per connection
//! - Enforce the read-header timeout on inbound connections
//! - Walk the lifecycle: Starting → Serving → Draining → Stopped
//!
//! During `Serving` two event sources race: the external shutdown signal and
//! failure of the accept loop itself. Whichever fires first decides the
//! transition. Draining closes the listener, asks every live connection to
//! finish its in-flight work, and gives the whole set a fixed grace period.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::lifecycle::{LifecycleState, StopKind};
use crate::net::ConnectionTracker;
use crate::relay::{self, RelayState, RelayTimeouts};

/// Default time in-flight connections get to finish once draining starts.
const GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Error type for the server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("serve: {0}")]
    Serve(#[source] io::Error),

    #[error("shutdown grace period elapsed with {active} connection(s) still open")]
    ShutdownTimeout { active: u64 },
}

/// Bind the listener. Failure here is fatal; the process must not pretend
/// to serve.
pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// The relay's HTTP server.
pub struct RelayServer {
    router: Router,
    read_header_timeout: Duration,
    grace_period: Duration,
    state_tx: watch::Sender<LifecycleState>,
}

impl RelayServer {
    /// Build the server around shared relay state.
    pub fn new(state: Arc<RelayState>, timeouts: &RelayTimeouts) -> Self {
        // Only GET /healthz is answered locally; any other method on the
        // path is still proxied.
        let router = Router::new()
            .route("/healthz", get(healthz).fallback(relay::relay))
            .fallback(relay::relay)
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let (state_tx, _) = watch::channel(LifecycleState::Starting);

        Self {
            router,
            read_header_timeout: timeouts.read_header,
            grace_period: GRACE_PERIOD,
            state_tx,
        }
    }

    /// Override the drain grace period.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Observe lifecycle transitions. States are published in order and
    /// never revisited.
    pub fn state_watch(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Serve until the shutdown signal fires or the listener fails.
    ///
    /// Returns `Ok(())` only for a clean stop: shutdown signalled and all
    /// in-flight connections finished within the grace period.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;

        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.read_header_timeout);
        builder.http2().timer(TokioTimer::new());
        let builder = Arc::new(builder);

        let tracker = ConnectionTracker::new();
        let (drain_tx, drain_rx) = watch::channel(false);

        self.state_tx.send_replace(LifecycleState::Serving);
        info!(address = %local_addr, "relay serving");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,

                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            error!(error = %err, "listener failed");
                            self.state_tx
                                .send_replace(LifecycleState::Stopped(StopKind::Errored));
                            return Err(ServerError::Serve(err));
                        }
                    };

                    let service = TowerToHyperService::new(self.router.clone());
                    let builder = Arc::clone(&builder);
                    let guard = tracker.track();
                    let mut drain = drain_rx.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let connection = builder.serve_connection_with_upgrades(io, service);
                        tokio::pin!(connection);

                        let result = tokio::select! {
                            result = connection.as_mut() => result,
                            _ = drain.changed() => {
                                // Finish the in-flight exchange, then close.
                                connection.as_mut().graceful_shutdown();
                                connection.as_mut().await
                            }
                        };

                        if let Err(err) = result {
                            debug!(peer = %peer_addr, error = %err, "connection closed with error");
                        }
                        drop(guard);
                    });
                }
            }
        }

        // Draining: the listener closes before any connection is asked to
        // stop, so nothing new sneaks in while we wait.
        self.state_tx.send_replace(LifecycleState::Draining);
        info!(active = tracker.active(), "shutdown requested, draining");
        drop(listener);
        let _ = drain_tx.send(true);

        match tokio::time::timeout(self.grace_period, tracker.wait_idle()).await {
            Ok(()) => {
                self.state_tx
                    .send_replace(LifecycleState::Stopped(StopKind::Clean));
                info!("relay stopped cleanly");
                Ok(())
            }
            Err(_) => {
                let active = tracker.active();
                self.state_tx
                    .send_replace(LifecycleState::Stopped(StopKind::Errored));
                error!(active, "grace period elapsed with connections still open");
                Err(ServerError::ShutdownTimeout { active })
            }
        }
    }
}

/// Fixed health response, independent of upstream reachability.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
