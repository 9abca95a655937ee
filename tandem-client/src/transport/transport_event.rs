use std::fmt;
use std::sync::Arc;

use tandem_core::IceCandidate;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::track::track_remote::TrackRemote;

use crate::media::TrackKind;

/// Events a peer transport reports back to the session that owns it.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local candidate was discovered and must be sent to the peer.
    CandidateGenerated(IceCandidate),

    StateChanged(PeerState),

    /// The peer started sending a track.
    RemoteTrack(RemoteTrack),
}

/// Connection health as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerState {
    /// Degraded after having been usable.
    pub fn is_lost(self) -> bool {
        matches!(self, PeerState::Disconnected | PeerState::Failed)
    }
}

impl From<RTCPeerConnectionState> for PeerState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => PeerState::New,
            RTCPeerConnectionState::Connecting => PeerState::Connecting,
            RTCPeerConnectionState::Connected => PeerState::Connected,
            RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
            RTCPeerConnectionState::Failed => PeerState::Failed,
            RTCPeerConnectionState::Closed => PeerState::Closed,
        }
    }
}

/// A track received from the peer.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    pub stream_id: String,
    /// Platform handle for reading RTP. Absent for transports that do not carry media.
    pub handle: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

/// The peer's media as received so far.
#[derive(Debug, Clone, Default)]
pub struct RemoteStream {
    pub tracks: Vec<RemoteTrack>,
}

impl RemoteStream {
    pub fn video(&self) -> Option<&RemoteTrack> {
        self.tracks.iter().rev().find(|t| t.kind == TrackKind::Video)
    }

    pub fn audio(&self) -> Option<&RemoteTrack> {
        self.tracks.iter().rev().find(|t| t.kind == TrackKind::Audio)
    }

    pub(crate) fn upsert(&mut self, track: RemoteTrack) {
        match self.tracks.iter_mut().find(|t| t.id == track.id) {
            Some(existing) => *existing = track,
            None => self.tracks.push(track),
        }
    }
}
