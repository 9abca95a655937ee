use std::sync::Arc;
use std::time::Duration;

use tandem_core::{IceCandidate, ParticipantId, SignalMessage};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{SessionError, TransportError};
use crate::media::{LocalStream, MediaTrackManager, TrackSender};
use crate::membership::{MembershipEvent, RoomMembership};
use crate::session::candidates::CandidateBuffer;
use crate::session::session_command::SessionCommand;
use crate::session::{SessionEvent, SessionState};
use crate::signaling::Subscription;
use crate::transport::{
    PeerState, PeerTransport, RemoteStream, SdpKind, TransportEvent, TransportFactory,
};

/// State observable through the coordinator handle.
pub(crate) struct SessionShared {
    pub state: watch::Sender<SessionState>,
    pub events: broadcast::Sender<SessionEvent>,
    pub remote: watch::Sender<Option<RemoteStream>>,
}

impl SessionShared {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        let (events, _) = broadcast::channel(64);
        let (remote, _) = watch::channel(None);
        Self {
            state,
            events,
            remote,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

/// A step that failed for a device reason and can be re-run by `retry`.
enum PendingStep {
    Offer,
    Answer(String),
}

struct Peer {
    transport: Arc<dyn PeerTransport>,
    events: mpsc::Receiver<TransportEvent>,
}

pub(crate) struct SessionActor {
    membership: RoomMembership,
    signals: Option<Subscription>,
    command_rx: mpsc::Receiver<SessionCommand>,
    media: MediaTrackManager,
    transports: Arc<dyn TransportFactory>,
    shared: Arc<SessionShared>,
    handshake_timeout: Option<Duration>,
    deadline: Option<Instant>,
    peer: Option<Peer>,
    candidates: CandidateBuffer,
    pending: Option<PendingStep>,
    ever_connected: bool,
}

impl SessionActor {
    pub fn new(
        membership: RoomMembership,
        signals: Subscription,
        command_rx: mpsc::Receiver<SessionCommand>,
        media: MediaTrackManager,
        transports: Arc<dyn TransportFactory>,
        shared: Arc<SessionShared>,
        handshake_timeout: Option<Duration>,
    ) -> Self {
        Self {
            membership,
            signals: Some(signals),
            command_rx,
            media,
            transports,
            shared,
            deadline: handshake_timeout.map(|t| Instant::now() + t),
            handshake_timeout,
            peer: None,
            candidates: CandidateBuffer::default(),
            pending: None,
            ever_connected: false,
        }
    }

    pub async fn run(mut self) {
        info!(
            "Session of {} in room {} started",
            self.membership.participant(),
            self.membership.room()
        );

        while !self.shared.state().is_closed() {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Session handle dropped. Tearing down.");
                            self.teardown().await;
                        }
                    }
                }

                msg = next_signal(&mut self.signals) => {
                    match msg {
                        Some(m) => self.handle_signal(m).await,
                        None => {
                            warn!("Signaling channel closed");
                            self.signals = None;
                            self.shared.emit(SessionEvent::Error(SessionError::SignalingUnavailable(
                                "relay connection closed".into(),
                            )));
                        }
                    }
                }

                Some(evt) = next_transport_event(&mut self.peer) => {
                    self.handle_transport_event(evt).await;
                }

                _ = deadline(self.deadline) => {
                    self.deadline = None;
                    let bound = self.handshake_timeout.unwrap_or_default();
                    self.fail(SessionError::SignalingUnavailable(format!(
                        "no connection established within {bound:?}"
                    )))
                    .await;
                }
            }
        }

        info!(
            "Session of {} in room {} finished",
            self.membership.participant(),
            self.membership.room()
        );
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Retry { reply } => {
                let result = self.retry().await;
                if let Err(e) = &result {
                    if !matches!(e, SessionError::Media(_) | SessionError::InvalidState { .. }) {
                        self.fail(e.clone()).await;
                    }
                }
                let _ = reply.send(result);
            }

            SessionCommand::Leave { reply } => {
                self.teardown().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        if msg.room() != self.membership.room() {
            return;
        }

        if let Some(event) = self.membership.observe(&msg) {
            match event {
                MembershipEvent::Counted(n) => {
                    debug!("Room {} has {} participant(s)", self.membership.room(), n);
                }
                MembershipEvent::Ready => {
                    let result = self.on_ready().await;
                    self.settle(result).await;
                }
                MembershipEvent::Full => {
                    let room = self.membership.room().clone();
                    warn!("Room {} is full", room);
                    self.fail(SessionError::RoomFull(room)).await;
                }
                MembershipEvent::PeerLeft(participant) => self.on_peer_left(participant).await,
            }
            return;
        }

        match msg {
            SignalMessage::Offer { sdp, .. } => {
                let result = self.on_offer(sdp).await;
                self.settle(result).await;
            }
            SignalMessage::Answer { sdp, .. } => {
                let result = self.on_answer(sdp).await;
                self.settle(result).await;
            }
            SignalMessage::IceCandidate { candidate, .. } => {
                self.on_remote_candidate(candidate).await;
            }
            _ => {}
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                self.membership
                    .send(SignalMessage::IceCandidate {
                        room: self.membership.room().clone(),
                        candidate,
                    })
                    .await;
            }

            TransportEvent::StateChanged(PeerState::Connected) => {
                let state = self.shared.state();
                if state.is_negotiating() || state == SessionState::Reconnecting {
                    self.ever_connected = true;
                    self.deadline = None;
                    self.set_state(SessionState::Connected);
                }
            }

            TransportEvent::StateChanged(peer_state) if peer_state.is_lost() => {
                let state = self.shared.state();
                if state == SessionState::Connected {
                    self.set_state(SessionState::Reconnecting);
                }
                if state == SessionState::Connected || !self.ever_connected {
                    warn!("Peer connection {:?} while {:?}", peer_state, state);
                    self.shared
                        .emit(SessionEvent::Error(SessionError::ConnectivityLost));
                }
            }

            TransportEvent::StateChanged(peer_state) => {
                debug!("Peer connection state {:?}", peer_state);
            }

            TransportEvent::RemoteTrack(track) => {
                info!("Receiving remote {:?} track {}", track.kind, track.id);
                self.shared.remote.send_modify(|remote| {
                    remote.get_or_insert_with(RemoteStream::default).upsert(track);
                });
                let stream = self.shared.remote.borrow().clone();
                if let Some(stream) = stream {
                    self.shared.emit(SessionEvent::RemoteStream(stream));
                }
            }
        }
    }

    async fn on_ready(&mut self) -> Result<(), SessionError> {
        let state = self.shared.state();
        if state != SessionState::Joining {
            debug!("Ignoring ready while {:?}", state);
            return Ok(());
        }
        if !self.membership.is_initiator() {
            warn!(
                "Ignoring ready in room {}: {} joined second and only answers",
                self.membership.room(),
                self.membership.participant()
            );
            return Ok(());
        }
        self.start_offer().await
    }

    async fn on_offer(&mut self, sdp: String) -> Result<(), SessionError> {
        match self.shared.state() {
            SessionState::Joining => self.answer_offer(sdp).await,
            SessionState::Connected | SessionState::Reconnecting => self.renegotiate(sdp).await,
            state @ (SessionState::Offering | SessionState::AwaitingAnswer) => {
                warn!("Ignoring offer while {:?}: this side initiates", state);
                Ok(())
            }
            state => {
                warn!("Ignoring offer while {:?}", state);
                Ok(())
            }
        }
    }

    async fn on_answer(&mut self, sdp: String) -> Result<(), SessionError> {
        let state = self.shared.state();
        if state != SessionState::AwaitingAnswer {
            warn!("Ignoring answer while {:?}", state);
            return Ok(());
        }
        let Some(transport) = self.transport() else {
            warn!("Ignoring answer without a peer connection");
            return Ok(());
        };

        transport
            .set_remote_description(SdpKind::Answer, sdp)
            .await
            .map_err(negotiation_failed)?;
        self.flush_candidates(&transport).await;
        Ok(())
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        let Some(candidate) = self.candidates.push(candidate) else {
            debug!(
                "Buffered remote candidate ({} pending)",
                self.candidates.len()
            );
            return;
        };
        if let Some(transport) = self.transport() {
            apply_candidate(&transport, candidate).await;
        }
    }

    async fn on_peer_left(&mut self, participant: ParticipantId) {
        info!("Peer {} left room {}", participant, self.membership.room());
        self.close_peer().await;
        self.pending = None;
        self.ever_connected = false;
        self.shared.emit(SessionEvent::PeerLeft(participant));
        self.set_state(SessionState::Joining);
    }

    async fn retry(&mut self) -> Result<(), SessionError> {
        let state = self.shared.state();
        let step = match self.pending.take() {
            Some(step) if state == SessionState::Joining => step,
            other => {
                self.pending = other;
                return Err(SessionError::InvalidState {
                    action: "retry",
                    state,
                });
            }
        };

        match step {
            PendingStep::Offer => self.start_offer().await,
            PendingStep::Answer(sdp) => self.answer_offer(sdp).await,
        }
    }

    async fn start_offer(&mut self) -> Result<(), SessionError> {
        self.set_state(SessionState::Offering);
        if let Err(e) = self.attach_local_media().await {
            return Err(self.park(PendingStep::Offer, e));
        }

        let transport = self.ensure_peer().await?;
        let sdp = transport.create_offer().await.map_err(negotiation_failed)?;
        self.membership
            .send(SignalMessage::Offer {
                room: self.membership.room().clone(),
                sdp,
            })
            .await;
        self.set_state(SessionState::AwaitingAnswer);
        Ok(())
    }

    async fn answer_offer(&mut self, sdp: String) -> Result<(), SessionError> {
        self.set_state(SessionState::AnsweringOffer);
        let local = match self.acquire_local().await {
            Ok(local) => local,
            Err(e) => return Err(self.park(PendingStep::Answer(sdp), e.into())),
        };

        let transport = self.ensure_peer().await?;
        transport
            .set_remote_description(SdpKind::Offer, sdp)
            .await
            .map_err(negotiation_failed)?;
        self.flush_candidates(&transport).await;

        let video = self
            .media
            .current_video_track()
            .await
            .unwrap_or_else(|| local.video.clone());
        transport
            .add_local_tracks(&local.audio, &video)
            .await
            .map_err(negotiation_failed)?;

        self.send_answer(&transport).await
    }

    /// A new offer on an established connection. The state is kept.
    async fn renegotiate(&mut self, sdp: String) -> Result<(), SessionError> {
        let Some(transport) = self.transport() else {
            return Ok(());
        };
        info!("Renegotiating with peer in room {}", self.membership.room());
        transport
            .set_remote_description(SdpKind::Offer, sdp)
            .await
            .map_err(negotiation_failed)?;
        self.send_answer(&transport).await
    }

    async fn send_answer(&mut self, transport: &Arc<dyn PeerTransport>) -> Result<(), SessionError> {
        let sdp = transport.create_answer().await.map_err(negotiation_failed)?;
        self.membership
            .send(SignalMessage::Answer {
                room: self.membership.room().clone(),
                sdp,
            })
            .await;
        Ok(())
    }

    /// Acquires local media and adds it to a fresh peer connection.
    async fn attach_local_media(&mut self) -> Result<(), SessionError> {
        let local = self.acquire_local().await?;
        let video = self
            .media
            .current_video_track()
            .await
            .unwrap_or_else(|| local.video.clone());

        let transport = self.ensure_peer().await?;
        transport
            .add_local_tracks(&local.audio, &video)
            .await
            .map_err(negotiation_failed)?;
        Ok(())
    }

    /// Waits for the device prompt while still honoring `leave`, handle drop
    /// and the handshake deadline. Signaling and transport events queue up
    /// until the prompt is answered.
    async fn acquire_local(&mut self) -> Result<LocalStream, SessionError> {
        let media = self.media.clone();
        let acquire = media.acquire_local();
        tokio::pin!(acquire);

        loop {
            tokio::select! {
                result = &mut acquire => return result.map_err(SessionError::from),

                cmd = self.command_rx.recv() => match cmd {
                    Some(SessionCommand::Leave { reply }) => {
                        info!("Leaving while local media is being requested");
                        self.teardown().await;
                        if let Some(reply) = reply {
                            let _ = reply.send(());
                        }
                        return Err(SessionError::Closed);
                    }
                    Some(SessionCommand::Retry { reply }) => {
                        let _ = reply.send(Err(SessionError::InvalidState {
                            action: "retry",
                            state: self.shared.state(),
                        }));
                    }
                    None => {
                        info!("Session handle dropped while local media is being requested");
                        self.teardown().await;
                        return Err(SessionError::Closed);
                    }
                },

                _ = deadline(self.deadline) => {
                    self.deadline = None;
                    let bound = self.handshake_timeout.unwrap_or_default();
                    self.fail(SessionError::SignalingUnavailable(format!(
                        "local media not granted within {bound:?}"
                    )))
                    .await;
                    return Err(SessionError::Closed);
                }
            }
        }
    }

    /// Remembers a device failure for `retry` and returns to `Joining`.
    /// Non-device errors pass through untouched.
    fn park(&mut self, step: PendingStep, error: SessionError) -> SessionError {
        if matches!(error, SessionError::Media(_)) {
            self.pending = Some(step);
            self.set_state(SessionState::Joining);
        }
        error
    }

    async fn ensure_peer(&mut self) -> Result<Arc<dyn PeerTransport>, SessionError> {
        if let Some(transport) = self.transport() {
            return Ok(transport);
        }

        let (events_tx, events_rx) = mpsc::channel(256);
        let transport = self
            .transports
            .create(events_tx)
            .await
            .map_err(negotiation_failed)?;

        let sender: Arc<dyn TrackSender> = transport.clone();
        self.media.attach_sender(sender).await;
        self.peer = Some(Peer {
            transport: transport.clone(),
            events: events_rx,
        });
        debug!("Created peer connection for room {}", self.membership.room());
        Ok(transport)
    }

    fn transport(&self) -> Option<Arc<dyn PeerTransport>> {
        self.peer.as_ref().map(|p| p.transport.clone())
    }

    async fn flush_candidates(&mut self, transport: &Arc<dyn PeerTransport>) {
        let buffered = self.candidates.mark_described();
        if !buffered.is_empty() {
            debug!("Applying {} buffered remote candidate(s)", buffered.len());
        }
        for candidate in buffered {
            apply_candidate(transport, candidate).await;
        }
    }

    async fn close_peer(&mut self) {
        if let Some(peer) = self.peer.take() {
            self.media.detach_sender().await;
            if let Err(e) = peer.transport.close().await {
                warn!("Failed to close peer connection: {}", e);
            }
        }
        self.candidates.reset();
        self.shared.remote.send_replace(None);
    }

    /// Device errors are reported and wait for `retry`; anything else ends the session.
    async fn settle(&mut self, result: Result<(), SessionError>) {
        match result {
            Ok(()) => {}
            Err(_) if self.shared.state().is_closed() => {}
            Err(e @ SessionError::Media(_)) => {
                warn!("Media unavailable: {}", e);
                self.shared.emit(SessionEvent::Error(e));
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn fail(&mut self, error: SessionError) {
        if self.shared.state().is_closed() {
            return;
        }
        error!(
            "Session in room {} failed: {}",
            self.membership.room(),
            error
        );
        self.shared.emit(SessionEvent::Error(error));
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if self.shared.state().is_closed() {
            return;
        }
        self.membership.leave().await;
        self.close_peer().await;
        self.media.release().await;
        self.pending = None;
        self.deadline = None;
        self.signals = None;
        self.set_state(SessionState::Closed);
    }

    fn set_state(&self, next: SessionState) {
        let prev = self.shared.state.send_replace(next);
        if prev != next {
            info!(
                "Session {} in room {}: {:?} -> {:?}",
                self.membership.participant(),
                self.membership.room(),
                prev,
                next
            );
        }
    }
}

fn negotiation_failed(e: TransportError) -> SessionError {
    SessionError::NegotiationFailed(e.to_string())
}

async fn apply_candidate(transport: &Arc<dyn PeerTransport>, candidate: IceCandidate) {
    if let Err(e) = transport.add_ice_candidate(candidate).await {
        warn!("Failed to add remote candidate: {}", e);
    }
}

async fn next_signal(signals: &mut Option<Subscription>) -> Option<SignalMessage> {
    match signals {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_transport_event(peer: &mut Option<Peer>) -> Option<TransportEvent> {
    match peer {
        Some(p) => p.events.recv().await,
        None => std::future::pending().await,
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
