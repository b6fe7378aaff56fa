//! Error types for the hub and its connections.

/// Why a message could not be handed to a connection's writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("outbound queue is full")]
    Full,

    #[error("connection writer is gone")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub actor has stopped; no command can be handed off.
    #[error("hub is not running")]
    HubClosed,
}
