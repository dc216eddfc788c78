//! OS signal handling.
//!
//! The server lifecycle itself only reacts to the [`Shutdown`] coordinator;
//! wiring OS signals to it happens here and is installed by `main`, not by
//! the core.

use crate::lifecycle::shutdown::Shutdown;

/// Trigger `shutdown` when SIGINT or SIGTERM arrives.
pub fn spawn_signal_listener(shutdown: Shutdown) {
    tokio::spawn(async move {
        termination_signal().await;
        tracing::info!("termination signal received");
        shutdown.trigger();
    });
}

async fn termination_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
