use tandem_client::{ParticipantId, SessionEvent, SessionState};

use crate::integration::init_tracing;
use crate::utils::{FakeDevices, Harness, next_event, reach};

#[tokio::test]
async fn test_peer_left_returns_to_joining() {
    init_tracing();

    let h = Harness::new();
    let alice_devices = FakeDevices::new();
    let alice = h.coordinator("alice", alice_devices.clone());
    let bob = h.coordinator("bob", FakeDevices::new());
    h.connect_pair(&alice, &bob, "R1").await.expect("pair failed to connect");

    let alice_id = ParticipantId::from("alice");
    let first_transport = h.network.latest(&alice_id).unwrap();
    let camera = alice.media().local_stream().await.unwrap();
    let mut alice_events = alice.events();

    bob.leave().await;
    assert_eq!(bob.state(), SessionState::Closed);

    let event = next_event(&mut alice_events, |e| matches!(e, SessionEvent::PeerLeft(_)))
        .await
        .unwrap();
    assert!(matches!(event, SessionEvent::PeerLeft(p) if p == ParticipantId::from("bob")));
    reach(&alice, SessionState::Joining).await.unwrap();

    assert!(first_transport.is_closed());
    assert!(alice.remote_stream().is_none());
    assert_eq!(alice.media().local_stream().await, Some(camera.clone()));

    // A newcomer gets a fresh connection, with Alice initiating again.
    let carol = h.coordinator("carol", FakeDevices::new());
    carol.join("R1").await.expect("carol failed to join");
    reach(&alice, SessionState::Connected).await.unwrap();
    reach(&carol, SessionState::Connected).await.unwrap();

    assert_eq!(h.network.transports_of(&alice_id), 2);
    assert_eq!(h.network.offers_created(&alice_id), 2);
    assert_eq!(alice_devices.prompts(), 1, "media is kept across peers");
    assert_eq!(
        h.network.video_received_by(&ParticipantId::from("carol")),
        Some(camera.video.id().to_owned())
    );

    alice.leave().await;
    carol.leave().await;
}
