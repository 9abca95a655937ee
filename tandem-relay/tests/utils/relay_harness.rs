use std::net::SocketAddr;

use anyhow::Result;
use tandem_relay::{RelayConfig, RelayServer, RelayService};

/// A relay served on an ephemeral local port for the duration of a test.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub service: RelayService,
}

impl TestRelay {
    pub async fn start() -> Result<Self> {
        Self::start_with(RelayConfig::default()).await
    }

    pub async fn start_with(config: RelayConfig) -> Result<Self> {
        let server = RelayServer::bind(&RelayConfig {
            bind: "127.0.0.1:0".into(),
            ..config
        })
        .await?;
        let addr = server.local_addr()?;
        let service = server.service();

        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                tracing::error!("[TestRelay] server stopped: {:#}", e);
            }
        });

        Ok(Self { addr, service })
    }

    pub fn ws_url(&self, participant: &str) -> String {
        format!("ws://{}/ws/{}", self.addr, participant)
    }
}
