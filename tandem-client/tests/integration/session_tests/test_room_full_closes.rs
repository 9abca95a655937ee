use tandem_client::{RoomId, SessionError, SessionEvent, SessionState};

use crate::integration::init_tracing;
use crate::utils::{FakeDevices, Harness, QUIET_MS, ms, next_event, reach};

#[tokio::test]
async fn test_room_full_closes() {
    init_tracing();

    let h = Harness::new();
    let alice = h.coordinator("alice", FakeDevices::new());
    let bob = h.coordinator("bob", FakeDevices::new());
    h.connect_pair(&alice, &bob, "R1").await.expect("pair failed to connect");

    let carol_devices = FakeDevices::new();
    let carol = h.coordinator("carol", carol_devices.clone());
    let mut carol_events = carol.events();

    carol.join("R1").await.expect("join should reach the relay");
    reach(&carol, SessionState::Closed).await.unwrap();

    let event = next_event(&mut carol_events, |e| matches!(e, SessionEvent::Error(_)))
        .await
        .unwrap();
    assert!(matches!(
        event,
        SessionEvent::Error(SessionError::RoomFull(room)) if room == RoomId::from("R1")
    ));
    assert_eq!(carol_devices.prompts(), 0);

    tokio::time::sleep(ms(QUIET_MS)).await;
    assert_eq!(alice.state(), SessionState::Connected);
    assert_eq!(bob.state(), SessionState::Connected);

    alice.leave().await;
    bob.leave().await;
}
