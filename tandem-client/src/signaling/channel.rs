use std::sync::Arc;

use tandem_core::SignalMessage;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::signaling::{Connector, Link};

struct ActiveLink {
    outgoing: mpsc::UnboundedSender<SignalMessage>,
    pump: JoinHandle<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveLink {
    fn is_open(&self) -> bool {
        !self.outgoing.is_closed() && !self.pump.is_finished()
    }
}

impl Drop for ActiveLink {
    fn drop(&mut self) {
        self.pump.abort();
        for task in &self.tasks {
            task.abort();
        }
    }
}

type Subscribers = Arc<Mutex<Vec<mpsc::UnboundedSender<SignalMessage>>>>;

struct ChannelInner {
    connector: Box<dyn Connector>,
    link: Mutex<Option<ActiveLink>>,
    subscribers: Subscribers,
}

/// Persistent bidirectional channel to the relay.
///
/// Cloning is cheap; all clones share one connection and one subscriber list.
#[derive(Clone)]
pub struct SignalingChannel {
    inner: Arc<ChannelInner>,
}

impl SignalingChannel {
    pub fn new(connector: impl Connector) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                connector: Box::new(connector),
                link: Mutex::new(None),
                subscribers: Arc::new(Mutex::new(Vec::new())),
            }),
        }
    }

    /// Establishes the connection. A call while already connected is a no-op.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let mut link = self.inner.link.lock().await;

        if link.as_ref().is_some_and(ActiveLink::is_open) {
            debug!("Signaling channel already connected");
            return Ok(());
        }
        link.take();

        let Link {
            outgoing,
            mut incoming,
            tasks,
        } = self.inner.connector.connect().await?;

        let subscribers = self.inner.subscribers.clone();
        let pump = tokio::spawn(async move {
            while let Some(msg) = incoming.recv().await {
                debug!("Signal in: {} (room {})", msg.event_name(), msg.room());
                let mut subs = subscribers.lock().await;
                subs.retain(|tx| tx.send(msg.clone()).is_ok());
            }
            info!("Signaling link closed by relay");
            subscribers.lock().await.clear();
        });

        *link = Some(ActiveLink {
            outgoing,
            pump,
            tasks,
        });
        info!("Signaling channel connected");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.inner
            .link
            .lock()
            .await
            .as_ref()
            .is_some_and(ActiveLink::is_open)
    }

    /// Enqueues a message for delivery. Returns whether it was handed to the
    /// transport; a disconnected channel drops the message.
    pub async fn send(&self, msg: SignalMessage) -> bool {
        let link = self.inner.link.lock().await;
        let Some(active) = link.as_ref().filter(|l| l.is_open()) else {
            warn!(
                "Dropping outgoing {} (room {}): signaling channel disconnected",
                msg.event_name(),
                msg.room()
            );
            return false;
        };

        debug!("Signal out: {} (room {})", msg.event_name(), msg.room());
        active.outgoing.send(msg).is_ok()
    }

    /// Registers a subscriber. Messages arrive on the returned queue in the
    /// order the relay delivered them; dropping it unsubscribes. The queue
    /// ends when the channel is disconnected or the relay closes the link.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().await.push(tx);
        Subscription { rx }
    }

    /// Releases the connection and ends every subscription.
    pub async fn disconnect(&self) {
        if self.inner.link.lock().await.take().is_some() {
            info!("Signaling channel disconnected");
        }
        self.inner.subscribers.lock().await.clear();
    }
}

/// Ordered queue of messages received by a [`SignalingChannel`].
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<SignalMessage>,
}

impl Subscription {
    /// Next message, or `None` once the channel was disconnected.
    pub async fn recv(&mut self) -> Option<SignalMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SignalMessage> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}
