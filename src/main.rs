use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use relay_proxy::config;
use relay_proxy::http::{self, RelayServer};
use relay_proxy::lifecycle::{signals, Shutdown};
use relay_proxy::observability;
use relay_proxy::outbound::OutboundStrategy;
use relay_proxy::relay::{self, RelayState, RelayTimeouts, UpstreamTarget};

#[derive(Parser, Debug)]
#[command(
    name = "relay-proxy",
    version,
    about = "HTTP reverse proxy forwarding to one upstream, optionally via a forward proxy"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.config)?;
    observability::logging::init(&config.observability.log_level);
    if config.observability.metrics_enabled {
        observability::metrics::init(&config.observability.metrics_address);
    }

    let strategy = OutboundStrategy::from_config(&config.outbound)?;
    let timeouts = RelayTimeouts::from_config(&config.server);
    let upstream = UpstreamTarget::parse(&config.upstream.url)?;
    let client = relay::assemble(strategy.clone(), &timeouts)?;

    tracing::info!(
        upstream = %config.upstream.url,
        outbound = %strategy,
        "forwarding transport ready"
    );

    let state = Arc::new(RelayState {
        client,
        upstream,
        request_timeout: timeouts.request,
    });
    let server = RelayServer::new(state, &timeouts);

    let listener = http::bind(&config.server.listen_addr).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
