use tandem_client::{ParticipantId, ShareKind, SessionState};

use crate::integration::init_tracing;
use crate::utils::{CONNECT_TIMEOUT_MS, FakeDevices, Harness, eventually};

#[tokio::test]
async fn test_screen_share_without_renegotiation() {
    init_tracing();

    let h = Harness::new();
    let alice_devices = FakeDevices::new();
    let alice = h.coordinator("alice", alice_devices.clone());
    let bob = h.coordinator("bob", FakeDevices::new());
    h.connect_pair(&alice, &bob, "R1").await.expect("pair failed to connect");

    let bob_id = ParticipantId::from("bob");
    let camera = alice.media().local_stream().await.unwrap().video;
    assert_eq!(h.network.video_received_by(&bob_id), Some(camera.id().to_owned()));
    let offers = h.network.total_offers();
    let answers = h.network.total_answers();

    let screen = alice.media().start_screen_share().await.unwrap();
    assert_eq!(h.network.video_received_by(&bob_id), Some(screen.id().to_owned()));
    assert_eq!(alice.media().flags().await.share, Some(ShareKind::Screen));

    // The user ends the share from the OS picker.
    assert!(alice_devices.end_screen_share());
    let camera_id = camera.id().to_owned();
    assert!(
        eventually(CONNECT_TIMEOUT_MS, || {
            h.network.video_received_by(&bob_id).as_deref() == Some(camera_id.as_str())
        })
        .await
    );
    assert_eq!(alice.media().current_video_track().await, Some(camera));
    assert_eq!(alice.media().flags().await.share, None);

    assert_eq!(h.network.total_offers(), offers);
    assert_eq!(h.network.total_answers(), answers);
    assert_eq!(alice.state(), SessionState::Connected);
    assert_eq!(bob.state(), SessionState::Connected);

    alice.leave().await;
    bob.leave().await;
}
