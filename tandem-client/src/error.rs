use std::fmt;
use std::time::Duration;

use tandem_core::RoomId;

use crate::session::SessionState;

/// Capture device a media error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Camera,
    Microphone,
    Screen,
    Canvas,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Camera => write!(f, "camera"),
            DeviceKind::Microphone => write!(f, "microphone"),
            DeviceKind::Screen => write!(f, "screen"),
            DeviceKind::Canvas => write!(f, "canvas"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("permission to use the {0} was denied")]
    PermissionDenied(DeviceKind),

    #[error("no {0} was found")]
    DeviceNotFound(DeviceKind),

    #[error("the {0} is already in use by another application")]
    DeviceBusy(DeviceKind),

    #[error("local media has not been acquired")]
    NotAcquired,

    #[error("invalid capture frame rate: {0}")]
    InvalidFrameRate(u32),

    #[error("capture failed: {0}")]
    Capture(String),
}

impl MediaError {
    /// Maps a platform capture error name (`NotAllowedError`, `NotFoundError`, ...)
    /// onto the error kinds the UI distinguishes.
    pub fn from_platform(name: &str, device: DeviceKind) -> Self {
        match name {
            "NotAllowedError" | "SecurityError" | "PermissionDeniedError" => {
                MediaError::PermissionDenied(device)
            }
            "NotFoundError" | "OverconstrainedError" | "DevicesNotFoundError" => {
                MediaError::DeviceNotFound(device)
            }
            "NotReadableError" | "TrackStartError" | "AbortError" => MediaError::DeviceBusy(device),
            other => MediaError::Capture(format!("{other} ({device})")),
        }
    }

    /// No matching device, or the device is held by someone else.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(
            self,
            MediaError::DeviceNotFound(_) | MediaError::DeviceBusy(_)
        )
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("signaling unavailable: {0}")]
    SignalingUnavailable(String),

    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    #[error("connectivity to the peer was lost")]
    ConnectivityLost,

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("cannot {action} while the session is {state:?}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("session is closed")]
    Closed,

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Rtc(#[from] webrtc::Error),

    #[error("{0}")]
    Negotiation(String),

    #[error("no outgoing video sender on this connection")]
    NoVideoSender,

    #[error("peer connection is closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
