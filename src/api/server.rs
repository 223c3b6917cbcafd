//! Server lifecycle: starts/stops the axum HTTP server and the session
//! sweeper.
//!
//! bind → spawn background tasks → return handle with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::portal_router;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Failed to get server address: {0}")]
    LocalAddr(std::io::Error),
}

/// Metadata for a running server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub addr: SocketAddr,
    pub started_at: String,
}

/// Handle to a running portal server.
pub struct PortalServer {
    pub info: ServerInfo,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_task: Option<JoinHandle<()>>,
    sweeper_task: JoinHandle<()>,
}

impl PortalServer {
    /// Signal graceful shutdown. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Portal server shutdown signal sent");
        }
        self.sweeper_task.abort();
    }

    /// Shut down and wait for in-flight requests to drain.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.server_task.take() {
            if let Err(e) = task.await {
                tracing::error!("Portal server task failed: {e}");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Bind `addr` and serve the portal router in a background task.
///
/// Port 0 binds an ephemeral port; the chosen address is in `info`.
pub async fn start_server(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<PortalServer, ServerError> {
    // 1. Bind
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    // 2. Build the router
    let app = portal_router(Arc::clone(&core));

    let info = ServerInfo {
        addr,
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    // 3. Session sweeper
    let sweeper_task = spawn_sweeper(Arc::clone(&core));

    // 4. Shutdown signal + server task
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Portal server received shutdown signal");
        };

        tracing::info!(%addr, "Portal server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Portal server error: {e}");
        }

        tracing::info!("Portal server stopped");
    });

    Ok(PortalServer {
        info,
        shutdown_tx: Some(shutdown_tx),
        server_task: Some(server_task),
        sweeper_task,
    })
}

fn spawn_sweeper(core: Arc<CoreState>) -> JoinHandle<()> {
    let period = core.config().sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            core.sweep_sessions();
        }
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use super::*;
    use crate::config::PortalConfig;
    use crate::core_state::test_config;

    fn ephemeral() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let core = Arc::new(CoreState::new(test_config()));
        let server = start_server(core, ephemeral()).await.expect("server should start");
        let port = server.info.addr.port();
        assert!(port > 0);
        assert!(!server.info.started_at.is_empty());

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.headers().get("cache-control").unwrap(), "no-store");

        server.stop().await;
    }

    #[tokio::test]
    async fn login_flow_over_tcp() {
        let core = Arc::new(CoreState::new(test_config()));
        let server = start_server(core, ephemeral()).await.unwrap();
        let base = format!("http://{}", server.info.addr);
        let client = client();

        let resp = client
            .post(format!("{base}/login"))
            .form(&[("email", "user@example.com"), ("password", "password123")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get("location").unwrap(), "/profile");
        let cookie = resp
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let resp = client
            .get(format!("{base}/profile"))
            .header("cookie", cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["attributes"]["identity"]["fullName"], "John Doe");

        server.stop().await;
    }

    #[tokio::test]
    async fn sweeper_removes_expired_sessions() {
        let core = Arc::new(CoreState::new(PortalConfig {
            session_ttl: Duration::from_millis(20),
            sweep_interval: Duration::from_millis(10),
            ..test_config()
        }));
        core.sessions().create();
        let server = start_server(Arc::clone(&core), ephemeral()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(core.sessions().is_empty());

        server.stop().await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let core = Arc::new(CoreState::new(test_config()));
        let mut server = start_server(core, ephemeral()).await.unwrap();
        server.shutdown();
        server.shutdown();
        server.stop().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let core = Arc::new(CoreState::new(test_config()));
        let first = start_server(Arc::clone(&core), ephemeral()).await.unwrap();

        let err = start_server(core, first.info.addr).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));

        first.stop().await;
    }
}
