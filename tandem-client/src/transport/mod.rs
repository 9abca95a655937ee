mod rtc;
mod transport_config;
mod transport_event;

pub use rtc::*;
pub use transport_config::*;
pub use transport_event::*;

use std::sync::Arc;

use async_trait::async_trait;
use tandem_core::IceCandidate;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::media::{MediaTrack, TrackSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// One peer connection, as seen by the session coordinator.
///
/// Events (local candidates, state changes, remote tracks) go to the sender
/// handed to [`TransportFactory::create`].
#[async_trait]
pub trait PeerTransport: TrackSender {
    async fn add_local_tracks(
        &self,
        audio: &MediaTrack,
        video: &MediaTrack,
    ) -> Result<(), TransportError>;

    /// Creates an offer, sets it as the local description and returns its SDP.
    async fn create_offer(&self) -> Result<String, TransportError>;

    /// Creates an answer, sets it as the local description and returns its SDP.
    async fn create_answer(&self) -> Result<String, TransportError>;

    async fn set_remote_description(&self, kind: SdpKind, sdp: String)
    -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync + 'static {
    async fn create(
        &self,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError>;
}
