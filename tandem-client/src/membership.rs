use tandem_core::{ParticipantId, RoomId, SignalMessage};
use tracing::{debug, info};

use crate::signaling::SignalingChannel;

/// What a relay message means for room membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// The relay reported the room's participant count.
    Counted(usize),
    /// This side was designated initiator.
    Ready,
    /// The room is full; this side was not admitted.
    Full,
    PeerLeft(ParticipantId),
}

/// Presence of one participant in one room.
pub struct RoomMembership {
    room: RoomId,
    participant: ParticipantId,
    channel: SignalingChannel,
    participants: usize,
    joined: bool,
    initiator: bool,
}

impl RoomMembership {
    pub fn new(room: RoomId, participant: ParticipantId, channel: SignalingChannel) -> Self {
        Self {
            room,
            participant,
            channel,
            participants: 0,
            joined: false,
            initiator: false,
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// Last participant count the relay reported.
    pub fn participants(&self) -> usize {
        self.participants
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Whether a `ready` addressed to this side should start an offer.
    ///
    /// Only the participant already present when the room filled up
    /// initiates. A joiner that was counted second, or one that has not
    /// seen its `joined` reply yet, never does.
    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    /// Announces presence. Returns whether the join was handed to the channel.
    pub async fn join(&mut self) -> bool {
        let sent = self
            .channel
            .send(SignalMessage::Join {
                room: self.room.clone(),
                participant: self.participant.clone(),
            })
            .await;
        self.joined = sent;
        if sent {
            info!("{} joining room {}", self.participant, self.room);
        }
        sent
    }

    /// Sends a message scoped to this room.
    pub async fn send(&self, msg: SignalMessage) -> bool {
        self.channel.send(msg).await
    }

    /// Interprets membership-related messages for this room. Everything
    /// else, including other rooms' traffic, yields `None`.
    pub fn observe(&mut self, msg: &SignalMessage) -> Option<MembershipEvent> {
        if msg.room() != &self.room {
            return None;
        }

        let event = match msg {
            SignalMessage::Joined { participants, .. } => {
                self.participants = *participants;
                self.initiator = *participants < 2;
                MembershipEvent::Counted(*participants)
            }
            SignalMessage::Ready { .. } => MembershipEvent::Ready,
            SignalMessage::RoomFull { .. } => {
                self.joined = false;
                MembershipEvent::Full
            }
            SignalMessage::UserLeft { participant, .. } if participant != &self.participant => {
                self.participants = self.participants.saturating_sub(1);
                self.initiator = self.joined;
                MembershipEvent::PeerLeft(participant.clone())
            }
            _ => return None,
        };
        debug!("Membership of {} in {}: {:?}", self.participant, self.room, event);
        Some(event)
    }

    /// Announces departure so the peer can clean up without waiting for a
    /// connection timeout. Only the first call sends anything.
    pub async fn leave(&mut self) {
        if !std::mem::replace(&mut self.joined, false) {
            return;
        }
        self.channel
            .send(SignalMessage::UserLeft {
                room: self.room.clone(),
                participant: self.participant.clone(),
            })
            .await;
        info!("{} left room {}", self.participant, self.room);
    }
}
