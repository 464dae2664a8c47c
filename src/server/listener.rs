//! Push server
//!
//! Binds the HTTP listener, spawns the heartbeat and serves the hub routes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpListener;

use crate::error::Result;
use crate::heartbeat;
use crate::registry::Hub;
use crate::server::config::ServerConfig;
use crate::server::http;

/// HTTP/SSE push server
pub struct PushServer {
    config: ServerConfig,
    hub: Arc<Hub>,
}

impl PushServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let hub = Arc::new(Hub::with_config(config.hub.clone()));
        Self { config, hub }
    }

    /// Get a reference to the hub, for publishing from the same process
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Push hub listening");

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let heartbeat_handle = heartbeat::spawn(
            Arc::clone(&self.hub),
            self.config.heartbeat_interval,
            Bytes::from(self.config.heartbeat_payload.clone()),
        );

        let app = http::router(Arc::clone(&self.hub));
        let hub = Arc::clone(&self.hub);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                // Open SSE streams only end once their connection is closed
                let closed = hub.close_all();
                tracing::info!(connections = closed, "Shutdown signal received");
            })
            .await;

        // Stop heartbeat on shutdown
        heartbeat_handle.abort();

        result?;
        Ok(())
    }
}
