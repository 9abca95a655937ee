use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tandem_core::{ParticipantId, RoomId, SignalMessage};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::signaling::SignalingChannel;

/// Where a remote participant's pointer was last seen.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorMarker {
    pub participant: ParticipantId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerEvent {
    Created(CursorMarker),
    Moved(CursorMarker),
    Removed(ParticipantId),
}

struct CursorInner {
    room: RoomId,
    participant: ParticipantId,
    channel: SignalingChannel,
    markers: DashMap<ParticipantId, CursorMarker>,
    last_sent: Mutex<Option<(f64, f64)>>,
    events: broadcast::Sender<MarkerEvent>,
}

impl CursorInner {
    fn apply(&self, msg: &SignalMessage) -> Option<MarkerEvent> {
        if msg.room() != &self.room {
            return None;
        }

        let event = match msg {
            SignalMessage::Cursor {
                participant, x, y, ..
            } if participant != &self.participant => {
                let marker = CursorMarker {
                    participant: participant.clone(),
                    x: *x,
                    y: *y,
                };
                match self.markers.insert(participant.clone(), marker.clone()) {
                    Some(_) => MarkerEvent::Moved(marker),
                    None => MarkerEvent::Created(marker),
                }
            }
            SignalMessage::UserLeft { participant, .. } => {
                self.markers.remove(participant)?;
                MarkerEvent::Removed(participant.clone())
            }
            _ => return None,
        };

        let _ = self.events.send(event.clone());
        Some(event)
    }

    fn clear(&self) {
        let participants: Vec<ParticipantId> =
            self.markers.iter().map(|m| m.key().clone()).collect();
        for participant in participants {
            if self.markers.remove(&participant).is_some() {
                let _ = self.events.send(MarkerEvent::Removed(participant));
            }
        }
    }
}

/// Shares the local pointer position over the signaling channel and keeps
/// one marker per remote participant.
///
/// Independent of the peer connection; works with signaling alone.
pub struct CursorBroadcaster {
    inner: Arc<CursorInner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl CursorBroadcaster {
    pub fn new(room: RoomId, participant: ParticipantId, channel: SignalingChannel) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(CursorInner {
                room,
                participant,
                channel,
                markers: DashMap::new(),
                last_sent: Mutex::new(None),
                events,
            }),
            listener: Mutex::new(None),
        }
    }

    /// Starts applying cursor and departure messages from the channel.
    /// A second call replaces the first listener.
    pub async fn start(&self) {
        let mut signals = self.inner.channel.subscribe().await;
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            while let Some(msg) = signals.recv().await {
                inner.apply(&msg);
            }
            debug!("Cursor listener for room {} stopped", inner.room);
        });

        let previous = self
            .listener
            .lock()
            .ok()
            .and_then(|mut listener| listener.replace(task));
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Publishes the local pointer position if it moved since the last call.
    /// Returns whether a message was sent.
    pub async fn publish(&self, x: f64, y: f64) -> bool {
        {
            let Ok(mut last) = self.inner.last_sent.lock() else {
                return false;
            };
            if *last == Some((x, y)) {
                return false;
            }
        }

        let sent = self
            .inner
            .channel
            .send(SignalMessage::Cursor {
                room: self.inner.room.clone(),
                participant: self.inner.participant.clone(),
                x,
                y,
            })
            .await;
        if sent {
            if let Ok(mut last) = self.inner.last_sent.lock() {
                *last = Some((x, y));
            }
        }
        sent
    }

    /// Applies one received message. Own cursor messages never create a marker.
    pub fn apply(&self, msg: &SignalMessage) -> Option<MarkerEvent> {
        self.inner.apply(msg)
    }

    pub fn marker(&self, participant: &ParticipantId) -> Option<CursorMarker> {
        self.inner.markers.get(participant).map(|m| m.value().clone())
    }

    /// Current markers, ordered by participant.
    pub fn markers(&self) -> Vec<CursorMarker> {
        let mut markers: Vec<CursorMarker> =
            self.inner.markers.iter().map(|m| m.value().clone()).collect();
        markers.sort_by(|a, b| a.participant.cmp(&b.participant));
        markers
    }

    pub fn marker_events(&self) -> broadcast::Receiver<MarkerEvent> {
        self.inner.events.subscribe()
    }

    /// Stops listening and removes every marker.
    pub fn shutdown(&self) {
        if let Some(task) = self.listener.lock().ok().and_then(|mut l| l.take()) {
            task.abort();
        }
        self.inner.clear();
        info!("Cursor broadcaster for room {} shut down", self.inner.room);
    }
}

impl Drop for CursorBroadcaster {
    fn drop(&mut self) {
        if let Ok(listener) = self.listener.get_mut() {
            if let Some(task) = listener.take() {
                task.abort();
            }
        }
    }
}
