use anyhow::Result;
use beacon_core::{config::AppConfig, RpcGateway};
use server::{build_app, router::AppState};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` takes precedence when set; otherwise the configured level
/// applies to the gateway crates over a `warn` baseline. The `none`
/// level turns logging off entirely.
fn init_logging(config: &AppConfig) {
    let directive = match config.logging.level.as_str() {
        "none" => "off".to_string(),
        level => format!("warn,beacon_core={level},server={level}"),
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if config.logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("configuration loading failed: {e}"))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("starting Beacon RPC gateway");

    let gateway = Arc::new(
        RpcGateway::from_config(config.clone())
            .map_err(|e| anyhow::anyhow!("gateway initialization failed: {e}"))?,
    );
    info!(
        chains = gateway.chain_ids().len(),
        cache_disabled = gateway.cache_disabled(),
        "gateway initialized"
    );

    let state = AppState { gateway, max_batch_size: config.server.max_batch_size };
    let app = build_app(state, config.server.max_concurrent_requests);

    let addr = config.socket_addr().map_err(anyhow::Error::msg)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "gateway listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("server shutdown complete");
    Ok(())
}
