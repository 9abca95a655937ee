use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::MediaError;
use crate::media::{MediaTrack, TrackSource};

/// Highest capture rate a canvas share accepts.
pub const MAX_CANVAS_FRAME_RATE: u32 = 240;

/// A rendered drawing surface that can be captured as video.
pub trait CaptureSurface: Send + Sync + 'static {
    /// The current frame, encoded. `None` when nothing changed or nothing
    /// is drawn yet; the frame is skipped.
    fn render_frame(&self) -> Option<Bytes>;
}

/// Starts capturing `surface` into a new canvas track at `frame_rate` fps.
/// Capture stops when the track ends. Rates outside
/// `1..=MAX_CANVAS_FRAME_RATE` are rejected.
pub fn capture_surface(
    surface: Arc<dyn CaptureSurface>,
    frame_rate: u32,
) -> Result<MediaTrack, MediaError> {
    if !(1..=MAX_CANVAS_FRAME_RATE).contains(&frame_rate) {
        return Err(MediaError::InvalidFrameRate(frame_rate));
    }

    let track = MediaTrack::new(TrackSource::Canvas, "canvas");
    let period = Duration::from_secs(1) / frame_rate;

    let pump_track = track.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = pump_track.ended() => break,
                _ = ticker.tick() => {
                    let Some(frame) = surface.render_frame() else {
                        continue;
                    };
                    if let Err(e) = pump_track.write_sample(frame, period).await {
                        warn!("Canvas frame dropped: {}", e);
                    }
                }
            }
        }
        debug!("Canvas capture {} stopped", pump_track.id());
    });

    Ok(track)
}
