use tandem_core::{ParticipantId, RoomId, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, TestRelay, WsTestClient, join_room};

#[tokio::test]
async fn test_cursor_forwarding() {
    init_tracing();

    let relay = TestRelay::start().await.expect("Failed to start relay");
    let mut alice = WsTestClient::connect(&relay, "alice").await.unwrap();
    let mut bob = WsTestClient::connect(&relay, "bob").await.unwrap();
    join_room(&mut alice, "R1").await.unwrap();
    join_room(&mut bob, "R1").await.unwrap();

    for (x, y) in [(10.0, 20.0), (11.0, 21.0), (12.5, 22.5)] {
        alice
            .send(&SignalMessage::Cursor {
                room: RoomId::from("R1"),
                participant: ParticipantId::from("someone-else"),
                x,
                y,
            })
            .await
            .unwrap();
    }

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(bob.expect("cursor", SIGNAL_TIMEOUT_MS).await.unwrap());
    }

    // Arrival order matches send order and identity is the sender's.
    let positions: Vec<(f64, f64)> = received
        .iter()
        .map(|msg| match msg {
            SignalMessage::Cursor {
                participant, x, y, ..
            } => {
                assert_eq!(participant, &ParticipantId::from("alice"));
                (*x, *y)
            }
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(positions, vec![(10.0, 20.0), (11.0, 21.0), (12.5, 22.5)]);

    alice.close().await.unwrap();
    bob.close().await.unwrap();
}
