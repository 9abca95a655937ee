use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tandem_core::SignalMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info, warn};

use crate::error::SessionError;
use crate::signaling::{Connector, Link};

/// Connects to the relay's websocket endpoint and speaks JSON `SignalMessage`s.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// `url` is the full endpoint, e.g. `ws://relay:8080/ws/<participant>`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Link, SessionError> {
        info!("Connecting to relay at {}", self.url);

        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| SessionError::SignalingUnavailable(e.to_string()))?;

        let (mut sender, mut receiver) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize signal message: {}", e);
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = sender.close().await;
        });

        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    WsMessage::Text(text) => {
                        match serde_json::from_str::<SignalMessage>(text.as_str()) {
                            Ok(signal) => {
                                if in_tx.send(signal).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Invalid SignalMessage from relay: {:?}", e),
                        }
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
        });

        let supervisor = tokio::spawn(async move {
            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };
            info!("Relay websocket closed");
        });

        Ok(Link::new(out_tx, in_rx).with_task(supervisor))
    }
}
