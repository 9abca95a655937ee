use tandem_client::{ParticipantId, SessionEvent, SessionState};

use crate::integration::init_tracing;
use crate::utils::{CONNECT_TIMEOUT_MS, FakeDevices, Harness, eventually, next_event, reach};

#[tokio::test]
async fn test_two_participants_connect() {
    init_tracing();

    let h = Harness::new();
    let alice_devices = FakeDevices::new();
    let bob_devices = FakeDevices::new();
    let alice = h.coordinator("alice", alice_devices.clone());
    let bob = h.coordinator("bob", bob_devices.clone());
    let mut alice_events = alice.events();

    h.join_in_order(&alice, &bob, "R1").await.expect("join failed");

    reach(&alice, SessionState::Connected).await.unwrap();
    reach(&bob, SessionState::Connected).await.unwrap();

    let alice_id = ParticipantId::from("alice");
    let bob_id = ParticipantId::from("bob");
    assert_eq!(h.network.offers_created(&alice_id), 1);
    assert_eq!(h.network.answers_created(&bob_id), 1);
    assert_eq!(h.network.offers_created(&bob_id), 0);
    assert_eq!(alice_devices.prompts(), 1);
    assert_eq!(bob_devices.prompts(), 1);

    // Alice sees Bob's camera.
    let bob_camera = bob.media().local_stream().await.expect("bob has media").video;
    let remote = alice.remote_stream().expect("alice has a remote stream");
    assert_eq!(remote.video().map(|t| t.id.as_str()), Some(bob_camera.id()));
    assert!(remote.audio().is_some());

    let event = next_event(&mut alice_events, |e| matches!(e, SessionEvent::RemoteStream(_)))
        .await
        .unwrap();
    assert!(matches!(event, SessionEvent::RemoteStream(s) if !s.tracks.is_empty()));

    // Local candidates crossed the relay and were applied after the descriptions.
    let bob_transport = h.network.latest(&bob_id).unwrap();
    assert!(eventually(CONNECT_TIMEOUT_MS, || bob_transport.applied_candidates().len() == 2).await);
    assert!(
        bob_transport
            .applied_candidates()
            .iter()
            .all(|(_, described)| *described)
    );

    alice.leave().await;
    bob.leave().await;
}
