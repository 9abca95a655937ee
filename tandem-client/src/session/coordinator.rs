use std::sync::Arc;
use std::time::Duration;

use tandem_core::{ParticipantId, RoomId};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{MediaError, SessionError};
use crate::media::{CaptureSurface, MediaDevices, MediaTrack, MediaTrackManager};
use crate::membership::RoomMembership;
use crate::session::actor::{SessionActor, SessionShared};
use crate::session::session_command::SessionCommand;
use crate::session::{SessionEvent, SessionState};
use crate::signaling::SignalingChannel;
use crate::transport::{RemoteStream, TransportFactory};

struct ActorHandle {
    room: RoomId,
    command_tx: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

/// Two-party peer session in one room.
///
/// Construct one per room membership and pass it by reference to whatever
/// drives it. The handshake runs on a private task; this handle issues
/// commands and observes state. Dropping it tears the session down.
pub struct SessionCoordinator {
    config: SessionConfig,
    participant: ParticipantId,
    channel: SignalingChannel,
    media: MediaTrackManager,
    transports: Arc<dyn TransportFactory>,
    shared: Arc<SessionShared>,
    actor: Mutex<Option<ActorHandle>>,
}

impl SessionCoordinator {
    pub fn new(
        config: SessionConfig,
        channel: SignalingChannel,
        devices: Arc<dyn MediaDevices>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            config,
            participant: ParticipantId::for_session(),
            channel,
            media: MediaTrackManager::new(devices),
            transports,
            shared: Arc::new(SessionShared::new()),
            actor: Mutex::new(None),
        }
    }

    /// Overrides the per-process participant identity.
    pub fn with_participant(mut self, participant: ParticipantId) -> Self {
        self.participant = participant;
        self
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn remote_stream(&self) -> Option<RemoteStream> {
        self.shared.remote.borrow().clone()
    }

    /// Local media of this session: toggles and screen/canvas share.
    pub fn media(&self) -> &MediaTrackManager {
        &self.media
    }

    /// Shares `surface` at the configured canvas frame rate.
    pub async fn share_canvas(
        &self,
        surface: Arc<dyn CaptureSurface>,
    ) -> Result<MediaTrack, MediaError> {
        self.media
            .start_canvas_share(surface, self.config.canvas_frame_rate)
            .await
    }

    /// Joins `room` and starts negotiating once a peer shows up.
    ///
    /// Only valid from `Idle`. Fails with `SignalingUnavailable` when the
    /// relay cannot be reached, leaving the session `Idle`.
    pub async fn join(&self, room: impl Into<RoomId>) -> Result<(), SessionError> {
        let room = room.into();
        let mut actor = self.actor.lock().await;

        let state = self.state();
        if state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                action: "join",
                state,
            });
        }

        self.channel.connect().await?;
        let signals = self.channel.subscribe().await;

        let mut membership =
            RoomMembership::new(room.clone(), self.participant.clone(), self.channel.clone());
        if !membership.join().await {
            return Err(SessionError::SignalingUnavailable(
                "join could not be sent".into(),
            ));
        }
        self.shared.state.send_replace(SessionState::Joining);

        let (command_tx, command_rx) = mpsc::channel(16);
        let session = SessionActor::new(
            membership,
            signals,
            command_rx,
            self.media.clone(),
            self.transports.clone(),
            self.shared.clone(),
            self.config.handshake_timeout(),
        );
        let task = tokio::spawn(session.run());

        *actor = Some(ActorHandle {
            room,
            command_tx,
            task,
        });
        Ok(())
    }

    /// Re-runs the offer or answer that failed because local media could not
    /// be acquired. Errors go to the caller.
    pub async fn retry(&self) -> Result<(), SessionError> {
        let command_tx = {
            let actor = self.actor.lock().await;
            match actor.as_ref() {
                Some(handle) if !handle.task.is_finished() => handle.command_tx.clone(),
                _ => {
                    return Err(SessionError::InvalidState {
                        action: "retry",
                        state: self.state(),
                    });
                }
            }
        };

        let (reply, rx) = oneshot::channel();
        command_tx
            .send(SessionCommand::Retry { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Leaves the room, closes the peer connection and releases local media.
    /// Safe to call repeatedly and before `join`; always ends `Closed`.
    pub async fn leave(&self) {
        let handle = self.actor.lock().await.take();

        if let Some(handle) = handle {
            let (reply, rx) = oneshot::channel();
            if handle
                .command_tx
                .send(SessionCommand::Leave { reply: Some(reply) })
                .await
                .is_ok()
            {
                let _ = rx.await;
            }
            if let Err(e) = handle.task.await {
                warn!("Session task for room {} ended abnormally: {}", handle.room, e);
            }
        }

        self.media.release().await;
        self.shared.remote.send_replace(None);
        if self.shared.state.send_replace(SessionState::Closed) != SessionState::Closed {
            info!("Session {} closed", self.participant);
        }
    }

    /// Waits until the state satisfies `pred`, for at most `bound`.
    pub async fn wait_for(
        &self,
        mut pred: impl FnMut(SessionState) -> bool,
        bound: Duration,
    ) -> Result<SessionState, SessionError> {
        let mut rx = self.shared.state.subscribe();
        let reached = tokio::time::timeout(bound, async {
            rx.wait_for(|state| pred(*state)).await.map(|state| *state)
        })
        .await;

        match reached {
            Ok(Ok(state)) => Ok(state),
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_) => {
                debug!("Gave up waiting after {:?} in {:?}", bound, self.state());
                Err(SessionError::Timeout(bound))
            }
        }
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.actor.get_mut().take() {
            let _ = handle
                .command_tx
                .try_send(SessionCommand::Leave { reply: None });
        }
    }
}
