use std::sync::Arc;

use async_trait::async_trait;
use tandem_client::{
    Connector, Link, MediaDevices, ParticipantId, RoomId, SessionConfig, SessionCoordinator,
    SessionError, SessionState, SignalMessage, SignalingChannel,
};
use tandem_relay::{RelayConfig, RelayService};
use tokio::sync::mpsc;

use super::mock_transport::MockNetwork;
use super::session_helpers::{CONNECT_TIMEOUT_MS, eventually, reach};

/// Connects a [`SignalingChannel`] straight to an in-process [`RelayService`].
pub struct LoopbackConnector {
    relay: RelayService,
    participant: ParticipantId,
}

impl LoopbackConnector {
    pub fn new(relay: RelayService, participant: ParticipantId) -> Self {
        Self { relay, participant }
    }
}

/// Drops the participant from the relay when the link task goes away,
/// the way a closed websocket would.
struct Presence {
    relay: RelayService,
    participant: ParticipantId,
}

impl Drop for Presence {
    fn drop(&mut self) {
        self.relay.remove_peer(&self.participant);
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self) -> Result<Link, SessionError> {
        let incoming = self.relay.connect(self.participant.clone());
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalMessage>();

        let presence = Presence {
            relay: self.relay.clone(),
            participant: self.participant.clone(),
        };
        let pump = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                presence.relay.handle_signal(&presence.participant, msg);
            }
        });

        Ok(Link::new(out_tx, incoming).with_task(pump))
    }
}

/// One in-process relay plus the mock network every session of a test shares.
pub struct Harness {
    pub relay: RelayService,
    pub network: MockNetwork,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            relay: RelayService::new(&RelayConfig::default()),
            network: MockNetwork::new(),
        }
    }

    pub fn channel(&self, participant: &str) -> SignalingChannel {
        SignalingChannel::new(LoopbackConnector::new(
            self.relay.clone(),
            ParticipantId::from(participant),
        ))
    }

    pub fn coordinator(
        &self,
        participant: &str,
        devices: Arc<dyn MediaDevices>,
    ) -> SessionCoordinator {
        self.coordinator_with(participant, devices, SessionConfig::default())
    }

    pub fn coordinator_with(
        &self,
        participant: &str,
        devices: Arc<dyn MediaDevices>,
        config: SessionConfig,
    ) -> SessionCoordinator {
        let id = ParticipantId::from(participant);
        SessionCoordinator::new(
            config,
            self.channel(participant),
            devices,
            self.network.factory(&id),
        )
        .with_participant(id)
    }

    /// Whether the relay has `participant` in `room` yet.
    pub fn is_member(&self, room: &str, participant: &str) -> bool {
        self.relay
            .rooms()
            .is_member(&RoomId::from(room), &ParticipantId::from(participant))
    }

    /// Joins `first`, waits until the relay has admitted it, then joins `second`.
    pub async fn join_in_order(
        &self,
        first: &SessionCoordinator,
        second: &SessionCoordinator,
        room: &str,
    ) -> anyhow::Result<()> {
        first.join(room).await?;
        let admitted = eventually(CONNECT_TIMEOUT_MS, || {
            self.is_member(room, first.participant().as_str())
        })
        .await;
        if !admitted {
            anyhow::bail!("{} was never admitted to {}", first.participant(), room);
        }
        second.join(room).await?;
        Ok(())
    }

    /// Joins both in order and waits until both are `Connected`.
    pub async fn connect_pair(
        &self,
        first: &SessionCoordinator,
        second: &SessionCoordinator,
        room: &str,
    ) -> anyhow::Result<()> {
        self.join_in_order(first, second, room).await?;
        reach(first, SessionState::Connected).await?;
        reach(second, SessionState::Connected).await?;
        Ok(())
    }

    /// A bare relay participant driven by hand, already in `room`.
    pub fn ghost(&self, participant: &str, room: &str) -> mpsc::UnboundedReceiver<SignalMessage> {
        let id = ParticipantId::from(participant);
        let rx = self.relay.connect(id.clone());
        self.relay.handle_signal(
            &id,
            SignalMessage::Join {
                room: RoomId::from(room),
                participant: id.clone(),
            },
        );
        rx
    }

    pub fn send_as(&self, participant: &str, msg: SignalMessage) {
        self.relay.handle_signal(&ParticipantId::from(participant), msg);
    }
}
