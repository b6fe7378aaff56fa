//! Hub actor
//!
//! A single task owns the connection registry and applies every register,
//! unregister and submit in turn. Presence snapshots are pushed onto a
//! separate queue that the same loop drains between commands, so producing
//! one never waits on the command queue it is being produced from.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::connection::{ConnectionHandle, ConnectionId};
use crate::error::HubError;
use crate::metrics::HubMetrics;
use crate::protocol::{MessageKind, Presence, WsMessage};
use crate::registry::Registry;

pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Commands processed by the hub actor
#[derive(Debug)]
pub enum HubCommand {
    Register {
        handle: ConnectionHandle,
    },
    Unregister {
        id: ConnectionId,
    },
    Submit {
        from: ConnectionId,
        message: WsMessage,
    },
    GetPresence {
        respond_to: oneshot::Sender<Presence>,
    },
    GetDisplayName {
        id: ConnectionId,
        respond_to: oneshot::Sender<Option<String>>,
    },
}

/// Handle to communicate with the hub actor
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
    metrics: Arc<HubMetrics>,
}

impl HubHandle {
    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| HubError::HubClosed)
    }

    /// Add an anonymous connection and broadcast presence.
    pub async fn register(&self, handle: ConnectionHandle) -> Result<(), HubError> {
        self.send(HubCommand::Register { handle }).await
    }

    /// Remove and close a connection. Unknown ids are ignored.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.send(HubCommand::Unregister { id }).await
    }

    /// Submit a message on behalf of connection `from`.
    ///
    /// For content kinds the sender is replaced with `from`'s registered
    /// display name; content from an anonymous connection is dropped.
    pub async fn submit(&self, from: ConnectionId, message: WsMessage) -> Result<(), HubError> {
        self.send(HubCommand::Submit { from, message }).await
    }

    pub async fn presence(&self) -> Result<Presence, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::GetPresence { respond_to: tx }).await?;
        rx.await.map_err(|_| HubError::HubClosed)
    }

    /// `Some("")` while the connection is anonymous, `None` once removed.
    pub async fn display_name(&self, id: ConnectionId) -> Result<Option<String>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::GetDisplayName { id, respond_to: tx })
            .await?;
        rx.await.map_err(|_| HubError::HubClosed)
    }

    pub fn metrics(&self) -> &Arc<HubMetrics> {
        &self.metrics
    }
}

/// Start the hub actor. It runs until every [`HubHandle`] is dropped.
pub fn spawn_hub(command_capacity: usize, metrics: Arc<HubMetrics>) -> HubHandle {
    let (sender, receiver) = mpsc::channel(command_capacity.max(1));
    let (presence_tx, presence_rx) = mpsc::unbounded_channel();

    let actor = HubActor {
        registry: Registry::new(),
        receiver,
        presence_tx,
        presence_rx,
        metrics: metrics.clone(),
    };
    tokio::spawn(actor.run());

    HubHandle { sender, metrics }
}

struct HubActor {
    registry: Registry,
    receiver: mpsc::Receiver<HubCommand>,
    presence_tx: mpsc::UnboundedSender<WsMessage>,
    presence_rx: mpsc::UnboundedReceiver<WsMessage>,
    metrics: Arc<HubMetrics>,
}

impl HubActor {
    async fn run(mut self) {
        info!("Hub started");

        loop {
            tokio::select! {
                biased;
                Some(presence) = self.presence_rx.recv() => {
                    self.metrics.presence_broadcast();
                    self.deliver(presence);
                }
                command = self.receiver.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        info!("Hub shutting down");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { handle } => {
                let id = handle.id();
                if self.registry.insert(handle) {
                    debug!(conn = %id, total = self.registry.len(), "Registered connection");
                    self.queue_presence();
                } else {
                    warn!(conn = %id, "Connection registered twice");
                }
            }
            HubCommand::Unregister { id } => self.unregister(id),
            HubCommand::Submit { from, message } => self.submit(from, message),
            HubCommand::GetPresence { respond_to } => {
                let _ = respond_to.send(self.registry.presence());
            }
            HubCommand::GetDisplayName { id, respond_to } => {
                let _ = respond_to.send(self.registry.name(id).map(str::to_string));
            }
        }
    }

    fn unregister(&mut self, id: ConnectionId) {
        if let Some(handle) = self.registry.remove(id) {
            handle.close();
            debug!(conn = %id, total = self.registry.len(), "Unregistered connection");
            self.queue_presence();
        }
    }

    fn submit(&mut self, from: ConnectionId, message: WsMessage) {
        match message.kind {
            MessageKind::Join => {
                let name = message.sender.unwrap_or_default();
                if self.registry.set_name(from, &name) {
                    info!(conn = %from, sender = %name, "User joined");
                    self.queue_presence();
                } else {
                    debug!(conn = %from, sender = %name, "Ignoring join");
                    self.metrics.message_dropped();
                }
            }
            MessageKind::Users => self.deliver(message),
            _ => {
                let sender = match self.registry.name(from) {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => {
                        debug!(conn = %from, kind = %message.kind, "Ignoring content from unnamed connection");
                        self.metrics.message_dropped();
                        return;
                    }
                };
                self.deliver(message.with_sender(sender));
            }
        }
    }

    /// Hand the presence snapshot to the presence queue.
    fn queue_presence(&self) {
        let presence = WsMessage::users(self.registry.presence());
        // The receiver lives in `self`, so this cannot fail while we run.
        let _ = self.presence_tx.send(presence);
    }

    /// Send `message` to every recipient its kind allows, then remove any
    /// recipient that failed.
    fn deliver(&mut self, message: WsMessage) {
        let message = Arc::new(message);
        let exclude = if message.kind.is_content() {
            message.sender.as_deref()
        } else {
            None
        };

        let mut failed = Vec::new();
        for recipient in self.registry.recipients(exclude) {
            match recipient.send(message.clone()) {
                Ok(()) => self.metrics.message_delivered(),
                Err(e) => {
                    warn!(conn = %recipient.id(), kind = %message.kind, "Error writing to client: {}", e);
                    self.metrics.send_failed();
                    failed.push(recipient.id());
                }
            }
        }

        for id in failed {
            self.unregister(id);
        }
    }
}
