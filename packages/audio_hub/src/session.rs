//! Client Session Loop
//!
//! One per WebSocket connection: registers with the hub, turns inbound
//! frames into hub submissions, and writes whatever the hub queues for this
//! connection back to the socket. The connection is unregistered however the
//! loop ends.

use axum::extract::ws::{Message, WebSocket};
use futures::{
    sink::{Sink, SinkExt},
    stream::StreamExt,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::connection::{ConnectionHandle, ConnectionId, Outbound};
use crate::error::HubError;
use crate::hub::HubHandle;
use crate::protocol::{Inbound, WsMessage, interpret_frame};

pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Run a room session until the client disconnects or the hub drops it.
pub async fn run_session(socket: WebSocket, hub: HubHandle, outbound_capacity: usize) {
    let (handle, outbound_rx) = ConnectionHandle::channel(outbound_capacity);
    let id = handle.id();

    info!(conn = %id, "Client connected");
    hub.metrics().connection_opened();

    if let Err(e) = hub.register(handle).await {
        error!(conn = %id, "Failed to register connection: {}", e);
        hub.metrics().connection_closed();
        return;
    }

    let (ws_sender, mut ws_receiver) = socket.split();
    let writer = write_outbound(id, ws_sender, outbound_rx);

    let reader = async {
        while let Some(frame) = ws_receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(conn = %id, "Error reading from client: {}", e);
                    hub.metrics().read_error();
                    break;
                }
            };

            let bytes = match frame {
                Message::Text(text) => text.as_str().as_bytes().to_vec(),
                Message::Binary(data) => data.to_vec(),
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            hub.metrics().message_received();
            if forward_frame(&hub, id, &bytes).await.is_err() {
                warn!(conn = %id, "Hub stopped, ending session");
                break;
            }
        }
    };

    tokio::select! {
        _ = writer => {
            debug!(conn = %id, "Writer ended");
        }
        _ = reader => {
            debug!(conn = %id, "Reader ended");
        }
    }

    let _ = hub.unregister(id).await;
    hub.metrics().connection_closed();
    info!(conn = %id, "Client disconnected");
}

/// Submit one decoded frame on behalf of connection `id`.
///
/// Content from an anonymous connection is submitted too; the hub drops it,
/// since only the hub can see the registered name without racing a join.
pub async fn forward_frame(
    hub: &HubHandle,
    id: ConnectionId,
    frame: &[u8],
) -> Result<(), HubError> {
    match interpret_frame(frame) {
        Inbound::Join { sender } => {
            debug!(conn = %id, sender = %sender, "Join requested");
            hub.submit(id, WsMessage::join(sender)).await
        }
        Inbound::Content(message) => hub.submit(id, message).await,
        Inbound::Ignored(reason) => {
            debug!(conn = %id, "Ignoring frame: {}", reason);
            hub.metrics().message_dropped();
            Ok(())
        }
    }
}

/// Drain the connection's outbound queue into the socket. Ends when the hub
/// closes the connection or the socket stops accepting writes.
async fn write_outbound<S>(
    id: ConnectionId,
    mut ws_sender: S,
    mut outbound_rx: mpsc::Receiver<Outbound>,
) where
    S: Sink<Message> + Unpin,
{
    while let Some(item) = outbound_rx.recv().await {
        match item {
            Outbound::Message(msg) => {
                let json = match serde_json::to_string(msg.as_ref()) {
                    Ok(j) => j,
                    Err(e) => {
                        error!(conn = %id, "Failed to serialize message: {}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    debug!(conn = %id, "Socket closed while writing");
                    return;
                }
            }
            Outbound::Close => break,
        }
    }

    let _ = ws_sender.send(Message::Close(None)).await;
    let _ = ws_sender.close().await;
}
