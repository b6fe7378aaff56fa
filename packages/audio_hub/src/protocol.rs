//! Audio Room Protocol
//!
//! Every frame the server writes is a JSON object tagged by `type`. Clients
//! announce themselves once with `join`, then stream either JSON `audio`
//! messages or raw binary chunks, which the server wraps into `audio`
//! messages with a base64 payload.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The `type` tag of a [`WsMessage`].
///
/// Unknown tags are kept verbatim in [`MessageKind::Other`] and routed like
/// `audio`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Join,
    Audio,
    Users,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Join => "join",
            Self::Audio => "audio",
            Self::Users => "users",
            Self::Other(kind) => kind,
        }
    }

    /// Content kinds are forwarded to peers with echo suppression.
    pub fn is_content(&self) -> bool {
        !matches!(self, Self::Join | Self::Users)
    }
}

impl From<String> for MessageKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "join" => Self::Join,
            "audio" => Self::Audio,
            "users" => Self::Users,
            _ => Self::Other(kind),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(kind) => kind,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message exchanged with room clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Base64 when it carries binary audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Registered connections, anonymous ones included (presence only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Named participants (presence only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
}

impl WsMessage {
    fn bare(kind: MessageKind) -> Self {
        Self {
            kind,
            sender: None,
            payload: None,
            count: None,
            users: None,
        }
    }

    pub fn join(sender: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            ..Self::bare(MessageKind::Join)
        }
    }

    pub fn audio(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
            ..Self::bare(MessageKind::Audio)
        }
    }

    /// Wrap an opaque binary chunk as base64 `audio`.
    pub fn raw_audio(bytes: &[u8]) -> Self {
        Self::audio(STANDARD.encode(bytes))
    }

    pub fn users(presence: Presence) -> Self {
        Self {
            count: Some(presence.count),
            users: Some(presence.users),
            ..Self::bare(MessageKind::Users)
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// Snapshot of who is in the room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub count: usize,
    /// Sorted display names of named connections
    pub users: Vec<String>,
}

/// What a session loop should do with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Join { sender: String },
    /// Content to forward; the sender is filled in by the hub.
    Content(WsMessage),
    Ignored(&'static str),
}

/// Interpret a decoded frame from a client.
///
/// Frames that are not a JSON message are treated as raw audio. Content keeps
/// only its kind and payload: a declared sender and any presence fields are
/// discarded here.
pub fn interpret_frame(frame: &[u8]) -> Inbound {
    let Ok(msg) = serde_json::from_slice::<WsMessage>(frame) else {
        return Inbound::Content(WsMessage::raw_audio(frame));
    };

    match msg.kind {
        MessageKind::Join => match msg.sender {
            Some(sender) if !sender.is_empty() => Inbound::Join { sender },
            _ => Inbound::Ignored("join without sender"),
        },
        MessageKind::Users => Inbound::Ignored("users is server-generated"),
        kind => Inbound::Content(WsMessage {
            payload: msg.payload,
            ..WsMessage::bare(kind)
        }),
    }
}
