use tandem_client::{IceCandidate, ParticipantId, RoomId, SessionState, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{CONNECT_TIMEOUT_MS, FakeDevices, Harness, eventually, expect_signal, reach};

fn candidate(n: u8) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{n} 1 udp 2122260223 192.168.1.{n} 5000 typ host"),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    }
}

#[tokio::test]
async fn test_candidates_buffered_until_offer() {
    init_tracing();

    let h = Harness::new();
    let room = RoomId::from("R1");
    let mut ghost = h.ghost("ghost", "R1");
    let bob = h.coordinator("bob", FakeDevices::new());

    bob.join("R1").await.expect("join failed");
    expect_signal(&mut ghost, "ready")
        .await
        .expect("ghost was present first");

    // Candidates overtake the offer.
    for n in [1, 2] {
        h.send_as(
            "ghost",
            SignalMessage::IceCandidate {
                room: room.clone(),
                candidate: candidate(n),
            },
        );
    }
    h.send_as(
        "ghost",
        SignalMessage::Offer {
            room: room.clone(),
            sdp: "mock-offer:999".into(),
        },
    );

    expect_signal(&mut ghost, "answer")
        .await
        .expect("bob should answer");
    assert_eq!(bob.state(), SessionState::AnsweringOffer);

    let transport = h.network.latest(&ParticipantId::from("bob")).unwrap();
    assert_eq!(
        transport.applied_candidates(),
        vec![(candidate(1), true), (candidate(2), true)]
    );

    // Once described, candidates apply right away.
    h.send_as(
        "ghost",
        SignalMessage::IceCandidate {
            room: room.clone(),
            candidate: candidate(3),
        },
    );
    assert!(eventually(CONNECT_TIMEOUT_MS, || transport.applied_candidates().len() == 3).await);
    assert_eq!(transport.applied_candidates()[2], (candidate(3), true));

    bob.leave().await;
    reach(&bob, SessionState::Closed).await.unwrap();
}
