use async_trait::async_trait;
use tandem_core::SignalMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::SessionError;

/// One established relay connection.
///
/// Messages pushed into `outgoing` are delivered in order; `incoming` yields
/// what the relay addressed to us and ends when the connection drops.
pub struct Link {
    pub outgoing: mpsc::UnboundedSender<SignalMessage>,
    pub incoming: mpsc::UnboundedReceiver<SignalMessage>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl Link {
    pub fn new(
        outgoing: mpsc::UnboundedSender<SignalMessage>,
        incoming: mpsc::UnboundedReceiver<SignalMessage>,
    ) -> Self {
        Self {
            outgoing,
            incoming,
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.tasks.push(task);
        self
    }
}

/// Opens the underlying transport of a [`crate::SignalingChannel`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Link, SessionError>;
}
