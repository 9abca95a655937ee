use tandem_client::{MediaError, MediaFlags, MediaTrackManager};

use crate::integration::init_tracing;
use crate::utils::FakeDevices;

#[tokio::test]
async fn test_toggles_keep_tracks_live() {
    init_tracing();

    let media = MediaTrackManager::new(FakeDevices::new());
    assert_eq!(media.toggle_microphone().await, Err(MediaError::NotAcquired));
    assert_eq!(media.flags().await, MediaFlags::default());

    let local = media.acquire_local().await.unwrap();
    assert_eq!(
        media.flags().await,
        MediaFlags {
            microphone: true,
            camera: true,
            share: None,
        }
    );

    assert_eq!(media.toggle_microphone().await, Ok(false));
    assert_eq!(media.toggle_camera().await, Ok(false));
    assert!(!local.audio.is_enabled());
    assert!(local.is_live(), "muting must not release the devices");

    assert_eq!(media.toggle_camera().await, Ok(true));
    let flags = media.flags().await;
    assert!(!flags.microphone);
    assert!(flags.camera);
}
