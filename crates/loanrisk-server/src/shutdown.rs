//! Graceful shutdown on SIGTERM / SIGINT.

use tracing::{info, warn};

/// Resolves when the process receives a shutdown signal.
///
/// On Unix this listens for both SIGTERM and SIGINT; elsewhere for Ctrl-C
/// only. If a handler cannot be installed the corresponding branch never
/// fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Shutdown signal received (SIGINT)"),
        _ = terminate => info!("Shutdown signal received (SIGTERM)"),
    }
}
