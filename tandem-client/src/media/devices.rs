use async_trait::async_trait;

use crate::error::MediaError;
use crate::media::{LocalStream, MediaTrack};

/// Platform capture service (camera/microphone prompt, screen picker).
///
/// Both calls may suspend indefinitely while the user answers a permission
/// dialog. Implementations map platform refusals through
/// [`MediaError::from_platform`].
#[async_trait]
pub trait MediaDevices: Send + Sync + 'static {
    /// Requests camera and microphone together.
    async fn user_media(&self) -> Result<LocalStream, MediaError>;

    /// Requests a screen-capture video track.
    async fn display_media(&self) -> Result<MediaTrack, MediaError>;
}
