//! Loan default prediction server.
//!
//! Loads the classifier and preprocessing descriptor at startup and serves
//! single and batched scoring over HTTP. Missing or corrupt artifacts leave
//! the process running in degraded mode so health checks can tell "alive" from
//! "ready".

use loanrisk_core::LoggingConfig;
use loanrisk_server::config::{apply_env_overrides, resolve_config};
use loanrisk_server::shutdown::shutdown_signal;
use loanrisk_server::{build_router, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config comes first so its logging section can drive the subscriber.
    let mut config = resolve_config(std::env::args().nth(1))?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_addr = %config.listen_addr,
        input_schema = ?config.input_schema,
        "Starting loanrisk prediction server"
    );

    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState::load(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(%listen_addr, "Prediction server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level. `format: json` switches
/// to structured output.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
