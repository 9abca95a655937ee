use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{MediaError, TransportError};
use crate::media::{CaptureSurface, LocalStream, MediaDevices, MediaTrack, capture_surface};

/// Something that sends one outgoing video track and can swap it in place.
#[async_trait]
pub trait TrackSender: Send + Sync {
    async fn replace_video_track(&self, track: &MediaTrack) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKind {
    Screen,
    Canvas,
}

/// Feature flags of the local media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaFlags {
    pub microphone: bool,
    pub camera: bool,
    pub share: Option<ShareKind>,
}

struct Substitute {
    track: MediaTrack,
    kind: ShareKind,
    watcher: JoinHandle<()>,
}

#[derive(Default)]
struct MediaState {
    local: Option<LocalStream>,
    substitute: Option<Substitute>,
    sender: Option<Arc<dyn TrackSender>>,
    /// Bumped by every release; a prompt answered after one is discarded.
    generation: u64,
}

impl MediaState {
    fn current_video(&self) -> Option<&MediaTrack> {
        match &self.substitute {
            Some(sub) => Some(&sub.track),
            None => self.local.as_ref().map(|l| &l.video),
        }
    }
}

impl Drop for MediaState {
    fn drop(&mut self) {
        if let Some(sub) = self.substitute.take() {
            sub.watcher.abort();
            sub.track.stop();
        }
        if let Some(local) = self.local.take() {
            local.stop();
        }
    }
}

/// Owns the local camera/microphone stream and any substitute video track.
///
/// Exactly one video track is current: the camera, or the active screen or
/// canvas share. Substitution swaps the sender's track in place, so the peer
/// sees the change without a new offer/answer.
#[derive(Clone)]
pub struct MediaTrackManager {
    devices: Arc<dyn MediaDevices>,
    state: Arc<Mutex<MediaState>>,
    acquiring: Arc<Mutex<()>>,
}

impl MediaTrackManager {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            state: Arc::new(Mutex::new(MediaState::default())),
            acquiring: Arc::new(Mutex::new(())),
        }
    }

    /// Acquires camera and microphone, or returns the stream already held.
    /// Concurrent callers wait for the same request, so the user is prompted once.
    ///
    /// The prompt may stay unanswered indefinitely. Only other acquisitions
    /// wait for it; `release` and the rest of the manager stay responsive, and
    /// a stream granted after a `release` is stopped instead of kept.
    pub async fn acquire_local(&self) -> Result<LocalStream, MediaError> {
        let _gate = self.acquiring.lock().await;

        let generation = {
            let mut state = self.state.lock().await;
            if let Some(local) = state.local.as_ref().filter(|l| l.is_live()) {
                debug!("Reusing local stream {}", local.id);
                return Ok(local.clone());
            }
            if let Some(stale) = state.local.take() {
                stale.stop();
            }
            state.generation
        };

        let stream = self.devices.user_media().await?;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            stream.stop();
            return Err(MediaError::Capture(
                "local media released while the prompt was pending".into(),
            ));
        }
        info!("Acquired local media stream {}", stream.id);
        state.local = Some(stream.clone());
        Ok(stream)
    }

    pub async fn local_stream(&self) -> Option<LocalStream> {
        self.state.lock().await.local.clone()
    }

    /// The one video track currently meant for the peer.
    pub async fn current_video_track(&self) -> Option<MediaTrack> {
        self.state.lock().await.current_video().cloned()
    }

    pub async fn flags(&self) -> MediaFlags {
        let state = self.state.lock().await;
        MediaFlags {
            microphone: state.local.as_ref().is_some_and(|l| l.audio.is_enabled()),
            camera: state.local.as_ref().is_some_and(|l| l.video.is_enabled()),
            share: state.substitute.as_ref().map(|s| s.kind),
        }
    }

    /// Replaces the outgoing video with a screen capture. When the capture
    /// ends outside the application the camera track is restored.
    pub async fn start_screen_share(&self) -> Result<MediaTrack, MediaError> {
        let track = self.devices.display_media().await?;
        self.install_substitute(track, ShareKind::Screen).await
    }

    /// Replaces the outgoing video with frames rendered from `surface`.
    pub async fn start_canvas_share(
        &self,
        surface: Arc<dyn CaptureSurface>,
        frame_rate: u32,
    ) -> Result<MediaTrack, MediaError> {
        let track = capture_surface(surface, frame_rate)?;
        self.install_substitute(track, ShareKind::Canvas).await
    }

    /// Reverts to the camera track. No-op when nothing is shared.
    pub async fn stop_share(&self) -> Result<(), MediaError> {
        let mut state = self.state.lock().await;
        let Some(sub) = state.substitute.take() else {
            return Ok(());
        };
        sub.watcher.abort();
        let result = restore_camera(&state).await;
        sub.track.stop();
        info!("Stopped {:?} share", sub.kind);
        result
    }

    /// Flips the microphone's enabled flag. Returns the new value.
    pub async fn toggle_microphone(&self) -> Result<bool, MediaError> {
        let state = self.state.lock().await;
        let local = state.local.as_ref().ok_or(MediaError::NotAcquired)?;
        let enabled = !local.audio.is_enabled();
        local.audio.set_enabled(enabled);
        debug!("Microphone enabled: {}", enabled);
        Ok(enabled)
    }

    /// Flips the camera's enabled flag. Returns the new value.
    pub async fn toggle_camera(&self) -> Result<bool, MediaError> {
        let state = self.state.lock().await;
        let local = state.local.as_ref().ok_or(MediaError::NotAcquired)?;
        let enabled = !local.video.is_enabled();
        local.video.set_enabled(enabled);
        debug!("Camera enabled: {}", enabled);
        Ok(enabled)
    }

    /// Routes future track substitutions to `sender`.
    pub async fn attach_sender(&self, sender: Arc<dyn TrackSender>) {
        self.state.lock().await.sender = Some(sender);
    }

    pub async fn detach_sender(&self) {
        self.state.lock().await.sender = None;
    }

    /// Stops every owned track and forgets them. Safe to call repeatedly.
    pub async fn release(&self) {
        let mut state = self.state.lock().await;
        state.sender = None;
        state.generation += 1;

        if let Some(sub) = state.substitute.take() {
            sub.watcher.abort();
            sub.track.stop();
        }
        if let Some(local) = state.local.take() {
            local.stop();
            info!("Released local media stream {}", local.id);
        }
    }

    async fn install_substitute(
        &self,
        track: MediaTrack,
        kind: ShareKind,
    ) -> Result<MediaTrack, MediaError> {
        let mut state = self.state.lock().await;

        if state.local.is_none() {
            track.stop();
            return Err(MediaError::NotAcquired);
        }
        if !track.is_live() {
            return Err(MediaError::Capture("capture ended before it was shared".into()));
        }

        if let Some(sender) = &state.sender {
            if let Err(e) = sender.replace_video_track(&track).await {
                track.stop();
                return Err(MediaError::Capture(e.to_string()));
            }
        }

        if let Some(previous) = state.substitute.take() {
            previous.watcher.abort();
            previous.track.stop();
            debug!("Replaced {:?} share", previous.kind);
        }

        let watcher = tokio::spawn(revert_when_ended(
            Arc::downgrade(&self.state),
            track.clone(),
        ));
        state.substitute = Some(Substitute {
            track: track.clone(),
            kind,
            watcher,
        });
        info!("Started {:?} share with track {}", kind, track.id());
        Ok(track)
    }
}

async fn restore_camera(state: &MediaState) -> Result<(), MediaError> {
    let (Some(sender), Some(local)) = (&state.sender, &state.local) else {
        return Ok(());
    };
    sender
        .replace_video_track(&local.video)
        .await
        .map_err(|e| MediaError::Capture(e.to_string()))
}

async fn revert_when_ended(state: Weak<Mutex<MediaState>>, track: MediaTrack) {
    track.ended().await;

    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = state.lock().await;
    if state
        .substitute
        .as_ref()
        .is_none_or(|sub| sub.track != track)
    {
        return;
    }

    if let Some(sub) = state.substitute.take() {
        info!("{:?} share ended externally, reverting to camera", sub.kind);
    }
    if let Err(e) = restore_camera(&state).await {
        warn!("Failed to restore camera track: {}", e);
    }
}
