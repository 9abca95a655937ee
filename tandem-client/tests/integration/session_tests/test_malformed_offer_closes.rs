use tandem_client::{ParticipantId, RoomId, SessionError, SessionEvent, SessionState, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{FakeDevices, Harness, expect_signal, next_event, reach};

#[tokio::test]
async fn test_malformed_offer_closes() {
    init_tracing();

    let h = Harness::new();
    let mut ghost = h.ghost("ghost", "R1");
    let bob_devices = FakeDevices::new();
    let bob = h.coordinator("bob", bob_devices.clone());
    let mut bob_events = bob.events();

    bob.join("R1").await.expect("join failed");
    expect_signal(&mut ghost, "ready").await.unwrap();

    h.send_as(
        "ghost",
        SignalMessage::Offer {
            room: RoomId::from("R1"),
            sdp: "v=0 garbage".into(),
        },
    );

    reach(&bob, SessionState::Closed).await.unwrap();
    let event = next_event(&mut bob_events, |e| matches!(e, SessionEvent::Error(_)))
        .await
        .unwrap();
    assert!(matches!(
        event,
        SessionEvent::Error(SessionError::NegotiationFailed(_))
    ));

    assert_eq!(bob_devices.prompts(), 1);
    assert!(bob.media().local_stream().await.is_none());
    assert!(h.network.latest(&ParticipantId::from("bob")).unwrap().is_closed());

    let left = expect_signal(&mut ghost, "user-left").await.unwrap();
    assert_eq!(
        left,
        SignalMessage::UserLeft {
            room: RoomId::from("R1"),
            participant: ParticipantId::from("bob"),
        }
    );
}
