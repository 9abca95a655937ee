use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::RelayConfig;
use crate::signaling::{RelayService, ws_handler};

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws/{participant}", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(service)
}

/// A bound relay, ready to accept connections.
pub struct RelayServer {
    listener: TcpListener,
    service: RelayService,
}

impl RelayServer {
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind.as_str())
            .await
            .with_context(|| format!("Failed to bind relay to {}", config.bind))?;

        Ok(Self {
            listener,
            service: RelayService::new(config),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn service(&self) -> RelayService {
        self.service.clone()
    }

    pub async fn run(self) -> Result<()> {
        info!("Relay listening on {}", self.local_addr()?);
        axum::serve(self.listener, router(self.service))
            .await
            .context("Relay server stopped")
    }
}

pub async fn serve(config: RelayConfig) -> Result<()> {
    RelayServer::bind(&config).await?.run().await
}
