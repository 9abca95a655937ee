use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::{DeviceKind, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Where a track's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    Screen,
    Canvas,
}

impl TrackSource {
    pub fn kind(self) -> TrackKind {
        match self {
            TrackSource::Microphone => TrackKind::Audio,
            TrackSource::Camera | TrackSource::Screen | TrackSource::Canvas => TrackKind::Video,
        }
    }

    pub fn device(self) -> DeviceKind {
        match self {
            TrackSource::Microphone => DeviceKind::Microphone,
            TrackSource::Camera => DeviceKind::Camera,
            TrackSource::Screen => DeviceKind::Screen,
            TrackSource::Canvas => DeviceKind::Canvas,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

struct TrackInner {
    id: String,
    source: TrackSource,
    enabled: AtomicBool,
    state: watch::Sender<TrackState>,
    rtp: Arc<TrackLocalStaticSample>,
}

/// A locally captured audio or video track.
///
/// Clones refer to the same track. Disabling mutes it without releasing the
/// device; `stop` ends it for good.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    pub fn new(source: TrackSource, stream_id: &str) -> Self {
        let id = Uuid::new_v4().to_string();
        let mime_type = match source.kind() {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let rtp = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            id.clone(),
            stream_id.to_owned(),
        ));
        let (state, _) = watch::channel(TrackState::Live);

        Self {
            inner: Arc::new(TrackInner {
                id,
                source,
                enabled: AtomicBool::new(true),
                state,
                rtp,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn source(&self) -> TrackSource {
        self.inner.source
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.source.kind()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn state(&self) -> TrackState {
        *self.inner.state.borrow()
    }

    pub fn is_live(&self) -> bool {
        self.state() == TrackState::Live
    }

    /// Ends the track. Platforms also call this when capture stops on its own
    /// (e.g. the user ends a screen share from the OS). Returns `true` only for
    /// the call that actually ended it.
    pub fn stop(&self) -> bool {
        let stopped = self.inner.state.send_if_modified(|state| {
            if *state == TrackState::Live {
                *state = TrackState::Ended;
                true
            } else {
                false
            }
        });
        if stopped {
            debug!("Track {} ({:?}) ended", self.inner.id, self.inner.source);
        }
        stopped
    }

    /// Resolves once the track has ended, immediately if it already has.
    pub async fn ended(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|state| *state == TrackState::Ended).await;
    }

    /// The RTP sink handed to the peer connection.
    pub fn rtp_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.inner.rtp.clone()
    }

    /// Pushes one encoded frame. Muted or ended tracks send nothing.
    pub async fn write_sample(&self, data: Bytes, duration: Duration) -> Result<(), TransportError> {
        if !self.is_live() || !self.is_enabled() {
            return Ok(());
        }
        self.inner
            .rtp
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MediaTrack {}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("source", &self.inner.source)
            .field("enabled", &self.is_enabled())
            .field("state", &self.state())
            .finish()
    }
}

/// Camera + microphone pair returned by a single device request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStream {
    pub id: String,
    pub audio: MediaTrack,
    pub video: MediaTrack,
}

impl LocalStream {
    /// Builds a fresh live camera/microphone pair under a new stream id.
    pub fn new() -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            audio: MediaTrack::new(TrackSource::Microphone, &id),
            video: MediaTrack::new(TrackSource::Camera, &id),
            id,
        }
    }

    pub fn tracks(&self) -> [&MediaTrack; 2] {
        [&self.audio, &self.video]
    }

    pub fn is_live(&self) -> bool {
        self.audio.is_live() && self.video.is_live()
    }

    pub fn stop(&self) {
        for track in self.tracks() {
            track.stop();
        }
    }
}

impl Default for LocalStream {
    fn default() -> Self {
        Self::new()
    }
}
