//! Subscriber connection handles.
//!
//! A subscriber is a bounded [`tokio::sync::mpsc`] queue. The sending half
//! ([`Connection`]) is owned by the registry while the subscription lasts;
//! the receiving half ([`Subscriber`]) is owned by the transport task that
//! writes frames to the client. When the transport goes away it drops its
//! [`Subscriber`], and the next delivery attempt fails.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::JobEvent;

/// Identity of a single attached subscriber.
///
/// Minted fresh for every attach, so two connections are never equal even
/// when they watch the same job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an event could not be handed to a subscriber.
///
/// Never surfaced to producers; the broadcaster prunes the connection and
/// moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The receiving side has been dropped.
    #[error("subscriber {0} is gone")]
    Closed(ConnectionId),

    /// The subscriber's queue had no room for a non-blocking send.
    #[error("subscriber {0} queue is full")]
    Full(ConnectionId),
}

impl DeliveryError {
    /// Returns the connection the failure refers to.
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        match self {
            Self::Closed(id) | Self::Full(id) => *id,
        }
    }
}

/// Sending half of a subscriber queue, as held by the registry.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::Sender<Arc<JobEvent>>,
}

impl Connection {
    /// Creates a connected pair with room for `buffer` undelivered events.
    ///
    /// A `buffer` of zero is treated as one.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, Subscriber) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let id = ConnectionId::new();
        (Self { id, tx }, Subscriber { id, rx })
    }

    /// Returns this connection's identity.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Enqueues `event`, waiting for queue space if the subscriber is slow.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Closed`] if the subscriber has gone away,
    /// including while this call was waiting.
    pub async fn deliver(&self, event: Arc<JobEvent>) -> Result<(), DeliveryError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| DeliveryError::Closed(self.id))
    }

    /// Enqueues `event` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Full`] if the queue has no free slot and
    /// [`DeliveryError::Closed`] if the subscriber has gone away.
    pub fn try_deliver(&self, event: Arc<JobEvent>) -> Result<(), DeliveryError> {
        self.tx.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full(self.id),
            TrySendError::Closed(_) => DeliveryError::Closed(self.id),
        })
    }

    /// Returns `true` once the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a subscriber queue, owned by the transport.
#[derive(Debug)]
pub struct Subscriber {
    id: ConnectionId,
    rx: mpsc::Receiver<Arc<JobEvent>>,
}

impl Subscriber {
    /// Returns the identity shared with the matching [`Connection`].
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once every [`Connection`] clone has been dropped, i.e.
    /// the subscriber was pruned or the hub shut down.
    pub async fn recv(&mut self) -> Option<Arc<JobEvent>> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<JobEvent>> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_per_channel() {
        let (a, _sa) = Connection::channel(4);
        let (b, _sb) = Connection::channel(4);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn pair_shares_identity() {
        let (conn, sub) = Connection::channel(4);
        assert_eq!(conn.id(), sub.id());
    }

    #[tokio::test]
    async fn deliver_reaches_subscriber() {
        let (conn, mut sub) = Connection::channel(4);
        tokio_test::assert_ok!(conn.deliver(Arc::new(JobEvent::paused())).await);
        let Some(event) = sub.recv().await else {
            panic!("expected an event");
        };
        assert_eq!(*event, JobEvent::paused());
    }

    #[tokio::test]
    async fn deliver_after_drop_is_closed() {
        let (conn, sub) = Connection::channel(4);
        drop(sub);
        assert!(conn.is_closed());
        let result = conn.deliver(Arc::new(JobEvent::resumed())).await;
        assert_eq!(result, Err(DeliveryError::Closed(conn.id())));
    }

    #[test]
    fn try_deliver_reports_full_queue() {
        let (conn, _sub) = Connection::channel(1);
        assert!(conn.try_deliver(Arc::new(JobEvent::paused())).is_ok());
        let result = conn.try_deliver(Arc::new(JobEvent::resumed()));
        assert_eq!(result, Err(DeliveryError::Full(conn.id())));
    }

    #[test]
    fn zero_buffer_is_usable() {
        let (conn, mut sub) = Connection::channel(0);
        assert!(conn.try_deliver(Arc::new(JobEvent::cancelled())).is_ok());
        assert!(sub.try_recv().is_some());
    }
}
