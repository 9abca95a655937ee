use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tandem_core::{ParticipantId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::signaling::RelayService;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(participant): Path<String>,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    let participant = ParticipantId::from(participant);

    ws.on_upgrade(move |socket| handle_socket(socket, participant, service))
}

async fn handle_socket(socket: WebSocket, participant: ParticipantId, service: RelayService) {
    info!("New WebSocket connection: {}", participant);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SignalMessage>();

    service.add_peer(participant.clone(), tx.clone());

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize signal message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let participant = participant.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalMessage>(&text) {
                        Ok(signal) => service.handle_signal(&participant, signal),
                        Err(e) => warn!("Invalid SignalMessage from {}: {:?}", participant, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.release_peer(&participant, &tx);
    info!("WebSocket disconnected: {}", participant);
}
