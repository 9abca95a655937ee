use tandem_client::{ParticipantId, SessionError, SessionState};

use crate::integration::init_tracing;
use crate::utils::{CONNECT_TIMEOUT_MS, FakeDevices, Harness, eventually, reach};

#[tokio::test]
async fn test_leave_before_join() {
    init_tracing();

    let h = Harness::new();
    let devices = FakeDevices::new();
    let alice = h.coordinator("alice", devices.clone());

    alice.leave().await;
    alice.leave().await;
    assert_eq!(alice.state(), SessionState::Closed);
    assert_eq!(devices.prompts(), 0);

    assert!(matches!(
        alice.join("R1").await,
        Err(SessionError::InvalidState {
            action: "join",
            state: SessionState::Closed
        })
    ));
}

#[tokio::test]
async fn test_leave_twice_after_connecting() {
    init_tracing();

    let h = Harness::new();
    let alice = h.coordinator("alice", FakeDevices::new());
    let bob = h.coordinator("bob", FakeDevices::new());
    h.connect_pair(&alice, &bob, "R1").await.expect("pair failed to connect");

    let local = alice.media().local_stream().await.unwrap();

    alice.leave().await;
    alice.leave().await;

    assert_eq!(alice.state(), SessionState::Closed);
    assert!(alice.media().local_stream().await.is_none());
    assert!(!local.is_live());
    assert!(alice.remote_stream().is_none());
    assert!(h.network.latest(&ParticipantId::from("alice")).unwrap().is_closed());
    assert!(eventually(CONNECT_TIMEOUT_MS, || !h.is_member("R1", "alice")).await);

    reach(&bob, SessionState::Joining).await.unwrap();
    bob.leave().await;
}
