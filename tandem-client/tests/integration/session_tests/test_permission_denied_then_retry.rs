use tandem_client::{DeviceKind, MediaError, SessionError, SessionEvent, SessionState};

use crate::integration::init_tracing;
use crate::utils::{FakeDevices, Harness, camera_denied, ms, next_event, reach};

#[tokio::test]
async fn test_permission_denied_then_retry() {
    init_tracing();

    let h = Harness::new();
    let bob_devices = FakeDevices::refusing(camera_denied());
    let alice = h.coordinator("alice", FakeDevices::new());
    let bob = h.coordinator("bob", bob_devices.clone());
    let mut bob_events = bob.events();

    h.join_in_order(&alice, &bob, "R1").await.expect("join failed");

    let event = next_event(&mut bob_events, |e| matches!(e, SessionEvent::Error(_)))
        .await
        .unwrap();
    assert!(matches!(
        event,
        SessionEvent::Error(SessionError::Media(MediaError::PermissionDenied(
            DeviceKind::Camera
        )))
    ));
    reach(&bob, SessionState::Joining).await.unwrap();
    assert!(bob.media().local_stream().await.is_none());

    // The answer never comes, so Alice is stuck until the caller gives up.
    let waited = alice
        .wait_for(|s| s == SessionState::Connected, ms(500))
        .await;
    assert!(matches!(waited, Err(SessionError::Timeout(_))));
    assert_eq!(alice.state(), SessionState::AwaitingAnswer);

    bob_devices.allow();
    bob.retry().await.expect("retry should answer the retained offer");

    reach(&alice, SessionState::Connected).await.unwrap();
    reach(&bob, SessionState::Connected).await.unwrap();
    assert_eq!(bob_devices.prompts(), 2);

    // Nothing left to retry.
    assert!(matches!(
        bob.retry().await,
        Err(SessionError::InvalidState { action: "retry", .. })
    ));

    alice.leave().await;
    bob.leave().await;
}
