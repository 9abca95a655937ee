use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// A network candidate in the browser's `RTCIceCandidateInit` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
}

/// Everything exchanged over the relay. Every variant is scoped by a room;
/// messages are fire-and-forget and never acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SignalMessage {
    Join {
        room: RoomId,
        participant: ParticipantId,
    },
    /// Relay reply to `Join` carrying the room's participant count.
    Joined {
        room: RoomId,
        participants: usize,
    },
    /// Relay reply to `Join` when the room is already full.
    RoomFull {
        room: RoomId,
    },
    /// Relay-asserted; sent only to the participant that must initiate.
    Ready {
        room: RoomId,
    },
    Offer {
        room: RoomId,
        sdp: String,
    },
    Answer {
        room: RoomId,
        sdp: String,
    },
    IceCandidate {
        room: RoomId,
        candidate: IceCandidate,
    },
    Cursor {
        room: RoomId,
        participant: ParticipantId,
        x: f64,
        y: f64,
    },
    UserLeft {
        room: RoomId,
        participant: ParticipantId,
    },
}

impl SignalMessage {
    pub fn room(&self) -> &RoomId {
        match self {
            SignalMessage::Join { room, .. }
            | SignalMessage::Joined { room, .. }
            | SignalMessage::RoomFull { room }
            | SignalMessage::Ready { room }
            | SignalMessage::Offer { room, .. }
            | SignalMessage::Answer { room, .. }
            | SignalMessage::IceCandidate { room, .. }
            | SignalMessage::Cursor { room, .. }
            | SignalMessage::UserLeft { room, .. } => room,
        }
    }

    /// Short event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            SignalMessage::Join { .. } => "join",
            SignalMessage::Joined { .. } => "joined",
            SignalMessage::RoomFull { .. } => "room-full",
            SignalMessage::Ready { .. } => "ready",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::IceCandidate { .. } => "ice-candidate",
            SignalMessage::Cursor { .. } => "cursor",
            SignalMessage::UserLeft { .. } => "user-left",
        }
    }

    /// Messages only the relay may originate.
    pub fn is_relay_asserted(&self) -> bool {
        matches!(
            self,
            SignalMessage::Joined { .. } | SignalMessage::RoomFull { .. } | SignalMessage::Ready { .. }
        )
    }
}
