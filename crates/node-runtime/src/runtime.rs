//! Node lifecycle: wire the subsystems, serve, shut down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mc_03_api_gateway::{GatewayError, GatewayService};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::{NodeConfig, SubsystemContainer};

/// How long in-flight requests get to finish on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The node runtime orchestrating all subsystems.
pub struct NodeRuntime {
    container: Arc<SubsystemContainer>,
    gateway: Arc<GatewayService>,
    server: Mutex<Option<JoinHandle<Result<(), GatewayError>>>>,
}

impl NodeRuntime {
    /// Validate the configuration and build every subsystem. Must run inside
    /// a tokio runtime.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let container = Arc::new(SubsystemContainer::new(config));
        let gateway = GatewayService::new(
            container.config.gateway.clone(),
            container.ledger.clone(),
            container.indexer.clone(),
            container.pipeline.clone(),
            container.relay.clone(),
            container.bus.clone(),
        )
        .context("Failed to create API gateway")?;

        Ok(Self {
            container,
            gateway: Arc::new(gateway),
            server: Mutex::new(None),
        })
    }

    /// Bind the HTTP listener and start serving in the background. Returns
    /// the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let listener = self
            .gateway
            .bind()
            .await
            .context("Failed to bind HTTP listener")?;
        let addr = listener.local_addr().context("Listener has no local address")?;

        let gateway = Arc::clone(&self.gateway);
        let server = tokio::spawn(async move { gateway.serve(listener).await });
        *self.server.lock() = Some(server);

        info!("===========================================");
        info!("  Mockchain v{}", env!("CARGO_PKG_VERSION"));
        info!("  HTTP: http://{addr}");
        info!("  Network: {}", self.container.config.ledger.network);
        info!("===========================================");
        Ok(addr)
    }

    /// Shutdown the node gracefully.
    ///
    /// 1. Stop accepting requests and end open streams
    /// 2. Wait for in-flight requests (bounded by [`SHUTDOWN_GRACE`])
    /// 3. Drain the indexing pipeline, then stop it
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.gateway.shutdown();

        let server = self.server.lock().take();
        if let Some(server) = server {
            match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!(error = %e, "HTTP server failed"),
                Ok(Err(e)) => error!(error = %e, "HTTP server task panicked"),
                Err(_) => warn!(grace = ?SHUTDOWN_GRACE, "HTTP server did not stop in time"),
            }
        }

        self.container.drain().await;
        self.container.stop_pipeline();
        info!("Shutdown complete");
    }

    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }

    pub fn gateway(&self) -> Arc<GatewayService> {
        Arc::clone(&self.gateway)
    }
}
