use tandem_client::{ParticipantId, SessionError, SessionEvent, SessionState};

use crate::integration::init_tracing;
use crate::utils::{CONNECT_TIMEOUT_MS, FakeDevices, Harness, eventually, next_event};

#[tokio::test]
async fn test_relay_drop_is_reported() {
    init_tracing();

    let h = Harness::new();
    let alice = h.coordinator("alice", FakeDevices::new());
    let mut events = alice.events();

    alice.join("R1").await.expect("join failed");
    assert!(eventually(CONNECT_TIMEOUT_MS, || h.is_member("R1", "alice")).await);

    h.relay.remove_peer(&ParticipantId::from("alice"));

    let event = next_event(&mut events, |e| matches!(e, SessionEvent::Error(_)))
        .await
        .unwrap();
    assert!(matches!(
        event,
        SessionEvent::Error(SessionError::SignalingUnavailable(_))
    ));
    assert_eq!(alice.state(), SessionState::Joining);

    alice.leave().await;
    assert_eq!(alice.state(), SessionState::Closed);
}
