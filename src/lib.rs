pub mod api; // HTTP transport
pub mod config;
pub mod core_state;
pub mod credentials; // Account directory
pub mod handlers; // Request handlers
pub mod models;
pub mod patients; // Patient registry
pub mod session_context;
pub mod session_store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
}

/// Initialize tracing, serve until SIGTERM/SIGINT, then drain.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::PortalConfig::from_env()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        session_ttl_secs = config.session_ttl.as_secs(),
        demo_account = config.seed_demo_account,
        "Configuration loaded"
    );

    let core = Arc::new(core_state::CoreState::new(config.clone()));
    let server = api::start_server(core, config.bind_addr).await?;
    tracing::info!(addr = %server.info.addr, "Listening");

    wait_for_shutdown_signal().await;
    server.stop().await;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                tracing::warn!("Signal handlers unavailable, falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
