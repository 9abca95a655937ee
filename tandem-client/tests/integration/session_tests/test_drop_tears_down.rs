use tandem_client::{ParticipantId, SessionState};

use crate::integration::init_tracing;
use crate::utils::{CONNECT_TIMEOUT_MS, FakeDevices, Harness, eventually, reach};

#[tokio::test]
async fn test_drop_tears_down() {
    init_tracing();

    let h = Harness::new();
    let alice = h.coordinator("alice", FakeDevices::new());
    let bob = h.coordinator("bob", FakeDevices::new());
    h.connect_pair(&alice, &bob, "R1").await.expect("pair failed to connect");

    let bob_local = bob.media().local_stream().await.unwrap();
    let bob_transport = h.network.latest(&ParticipantId::from("bob")).unwrap();
    drop(bob);

    reach(&alice, SessionState::Joining).await.unwrap();
    assert!(eventually(CONNECT_TIMEOUT_MS, || bob_transport.is_closed()).await);
    assert!(eventually(CONNECT_TIMEOUT_MS, || !bob_local.is_live()).await);

    alice.leave().await;
}
