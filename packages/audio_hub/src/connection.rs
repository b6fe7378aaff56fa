use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::error::SendError;
use crate::protocol::WsMessage;

/// Unique identifier for a connection
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0.simple())
    }
}

/// Items queued for a connection's writer task
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(Arc<WsMessage>),
    Close,
}

/// Write/close capability for one connection, held by the hub.
///
/// Sends never wait: a full queue means the peer is not keeping up and is
/// reported the same way as a closed one.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiving end its writer task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            outbound,
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, message: Arc<WsMessage>) -> Result<(), SendError> {
        self.outbound
            .try_send(Outbound::Message(message))
            .map_err(|e| match e {
                TrySendError::Full(_) => SendError::Full,
                TrySendError::Closed(_) => SendError::Closed,
            })
    }

    /// Ask the writer to close the transport. Dropping the last handle has
    /// the same effect once the queue drains.
    pub fn close(&self) {
        let _ = self.outbound.try_send(Outbound::Close);
    }
}
