//! Dashboard HTTP server
//!
//! Thin JSON adapter over the state controller. Each handler translates a
//! request into controller calls and serializes the resulting snapshot.

mod routes;

pub use routes::{router, ConfigResponse, DashboardView};

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::controller::Controller;

/// Running dashboard server
pub struct ServerHandle {
    addr: SocketAddr,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests to finish
    ///
    /// The listening socket is closed once this returns.
    pub async fn shutdown(self) -> Result<()> {
        self.stop.send_replace(true);
        self.task
            .await
            .context("Dashboard server task did not finish cleanly")
    }
}

/// Bind the dashboard server and start serving in the background
///
/// Port 0 picks a free port; the bound address is available from the
/// returned handle.
pub async fn start(addr: SocketAddr, controller: Controller) -> Result<ServerHandle> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard server to {}", addr))?;
    let addr = listener.local_addr()?;
    info!("Dashboard listening on http://{}", addr);

    // Dropping the handle also stops the server
    let (stop, mut stopped) = watch::channel(false);
    let signal = async move {
        let _ = stopped.wait_for(|stop| *stop).await;
    };
    let serve = axum::serve(listener, router(controller))
        .with_graceful_shutdown(signal);

    let task = tokio::spawn(async move {
        if let Err(e) = serve.await {
            error!(error = %e, "Dashboard server failed");
        }
        info!("Dashboard server stopped");
    });

    Ok(ServerHandle { addr, stop, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::DEFAULT_CHANNEL_BUFFER;

    fn any_port() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn test_server_starts_on_port() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);

        let handle = start(any_port(), controller).await.unwrap();

        assert!(handle.addr().port() > 0);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_listener() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);

        let handle = start(any_port(), controller).await.unwrap();
        let addr = handle.addr();

        assert!(tokio::net::TcpStream::connect(addr).await.is_ok());

        handle.shutdown().await.unwrap();

        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_server() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);

        let handle = start(any_port(), controller).await.unwrap();
        let addr = handle.addr();
        drop(handle);

        let mut closed = false;
        for _ in 0..100 {
            if tokio::net::TcpStream::connect(addr).await.is_err() {
                closed = true;
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }
        assert!(closed);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let controller = Controller::spawn(DEFAULT_CHANNEL_BUFFER);
        let first = start(any_port(), controller.clone()).await.unwrap();

        let err = start(first.addr(), controller).await.err().unwrap();
        assert!(err.to_string().contains("Failed to bind dashboard server"));

        first.shutdown().await.unwrap();
    }
}
