use std::sync::Arc;

use dashmap::DashMap;
use tandem_core::{ParticipantId, RoomId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::room::{JoinOutcome, RoomManager};

struct RelayInner {
    peers: DashMap<ParticipantId, mpsc::UnboundedSender<SignalMessage>>,
    rooms: RoomManager,
}

/// Room bookkeeping and message routing between connected participants.
///
/// Transport agnostic: the websocket handler and in-process callers both
/// feed it through [`RelayService::handle_signal`].
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                peers: DashMap::new(),
                rooms: RoomManager::new(config.room_capacity),
            }),
        }
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.inner.rooms
    }

    pub fn add_peer(&self, participant: ParticipantId, tx: mpsc::UnboundedSender<SignalMessage>) {
        if self.inner.peers.insert(participant.clone(), tx).is_some() {
            warn!("Participant {} reconnected, replacing old connection", participant);
        }
    }

    /// Registers an in-process participant and returns what the relay sends it.
    pub fn connect(&self, participant: ParticipantId) -> mpsc::UnboundedReceiver<SignalMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_peer(participant, tx);
        rx
    }

    /// Like [`Self::remove_peer`], but only if `tx` is still the registered
    /// connection. A participant that already reconnected is left alone.
    pub fn release_peer(&self, participant: &ParticipantId, tx: &mpsc::UnboundedSender<SignalMessage>) {
        let current = self
            .inner
            .peers
            .get(participant)
            .is_some_and(|peer| peer.same_channel(tx));
        if current {
            self.remove_peer(participant);
        } else {
            debug!("Stale connection of {} closed", participant);
        }
    }

    pub fn is_connected(&self, participant: &ParticipantId) -> bool {
        self.inner.peers.contains_key(participant)
    }

    /// Forgets the connection and tells the remaining members of every room
    /// it was in that it left.
    pub fn remove_peer(&self, participant: &ParticipantId) {
        self.inner.peers.remove(participant);

        for (room, remaining) in self.inner.rooms.leave_all(participant) {
            info!("{} dropped out of room {}", participant, room);
            self.announce_departure(&room, participant, &remaining);
        }
    }

    /// Routes one message received from `from`. Identity fields are stamped
    /// with `from`; relay-only messages from clients are ignored.
    pub fn handle_signal(&self, from: &ParticipantId, msg: SignalMessage) {
        if msg.is_relay_asserted() {
            warn!("Ignoring relay-only {} from {}", msg.event_name(), from);
            return;
        }

        match msg {
            SignalMessage::Join { room, .. } => self.join(from, room),

            SignalMessage::UserLeft { room, .. } => {
                match self.inner.rooms.leave(&room, from) {
                    Some(remaining) => self.announce_departure(&room, from, &remaining),
                    None => debug!("{} left room {} it was not in", from, room),
                }
            }

            SignalMessage::Cursor { room, x, y, .. } => self.forward(
                from,
                SignalMessage::Cursor {
                    room,
                    participant: from.clone(),
                    x,
                    y,
                },
            ),

            other => self.forward(from, other),
        }
    }

    /// Delivers `msg` to one participant. Returns whether it was connected.
    pub fn send_signal(&self, participant: &ParticipantId, msg: SignalMessage) -> bool {
        let Some(peer) = self.inner.peers.get(participant) else {
            warn!(
                "Attempted to send {} to disconnected participant {}",
                msg.event_name(),
                participant
            );
            return false;
        };

        if peer.send(msg).is_err() {
            warn!("Connection of {} is closing", participant);
            return false;
        }
        true
    }

    fn join(&self, participant: &ParticipantId, room: RoomId) {
        match self.inner.rooms.join(&room, participant) {
            JoinOutcome::Joined {
                participants,
                others,
            } => {
                info!("{} joined room {} ({} present)", participant, room, participants);
                self.send_signal(
                    participant,
                    SignalMessage::Joined {
                        room: room.clone(),
                        participants,
                    },
                );
                // The side already present initiates.
                if participants == 2 {
                    for other in &others {
                        self.send_signal(other, SignalMessage::Ready { room: room.clone() });
                    }
                }
            }
            JoinOutcome::AlreadyMember { participants } => {
                debug!("{} rejoined room {}", participant, room);
                self.send_signal(participant, SignalMessage::Joined { room, participants });
            }
            JoinOutcome::Full => {
                warn!("{} rejected: room {} is full", participant, room);
                self.send_signal(participant, SignalMessage::RoomFull { room });
            }
        }
    }

    fn forward(&self, from: &ParticipantId, msg: SignalMessage) {
        let room = msg.room();
        if !self.inner.rooms.is_member(room, from) {
            warn!(
                "Dropping {} from {}: not a member of room {}",
                msg.event_name(),
                from,
                room
            );
            return;
        }

        for other in self.inner.rooms.others(room, from) {
            debug!("Forwarding {} from {} to {}", msg.event_name(), from, other);
            self.send_signal(&other, msg.clone());
        }
    }

    fn announce_departure(&self, room: &RoomId, participant: &ParticipantId, remaining: &[ParticipantId]) {
        for other in remaining {
            self.send_signal(
                other,
                SignalMessage::UserLeft {
                    room: room.clone(),
                    participant: participant.clone(),
                },
            );
        }
    }
}
