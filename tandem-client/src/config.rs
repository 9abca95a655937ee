use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tandem_core::IceServerConfig;
use tandem_core::utils::default_ice_servers;
use tracing::info;

use crate::error::ConfigError;
use crate::transport::TransportConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base websocket URL of the relay; the participant id is appended as `/ws/{id}`.
    pub relay_url: String,
    pub ice_servers: Vec<IceServerConfig>,
    /// Bound on reaching `Connected` after `join`. `None` waits forever.
    pub handshake_timeout_ms: Option<u64>,
    pub canvas_frame_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:8080".to_owned(),
            ice_servers: default_ice_servers(),
            handshake_timeout_ms: None,
            canvas_frame_rate: 30,
        }
    }
}

impl SessionConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json(&raw)?;
        info!("Loaded session config from {}", path.display());
        Ok(config)
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_ms.map(Duration::from_millis)
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            ice_servers: self.ice_servers.clone(),
        }
    }

    pub fn signaling_url(&self, participant: &tandem_core::ParticipantId) -> String {
        format!("{}/ws/{}", self.relay_url.trim_end_matches('/'), participant)
    }
}
