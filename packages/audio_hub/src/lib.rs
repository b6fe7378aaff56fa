//! Audio Hub - broadcast hub for shared audio rooms
//!
//! Clients connect over WebSocket, announce a display name with `join`, and
//! stream audio. The hub relays each audio message to everyone in the room
//! except connections sharing the sender's name, and keeps every client up
//! to date with who is present.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use audio_hub::{AppState, HubMetrics, create_routes, spawn_hub};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hub = spawn_hub(256, Arc::new(HubMetrics::new()));
//!     let app = create_routes(AppState {
//!         hub,
//!         outbound_capacity: 64,
//!     });
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
mod connection;
mod error;
pub mod hub;
mod metrics;
pub mod protocol;
mod registry;
mod routes;
pub mod session;

pub use config::HubConfig;
pub use connection::{ConnectionHandle, ConnectionId, Outbound};
pub use error::{HubError, SendError};
pub use hub::{HubHandle, spawn_hub};
pub use metrics::{HubMetrics, MetricsSnapshot};
pub use protocol::{MessageKind, Presence, WsMessage};
pub use routes::{API_BASE_PATH, AppState, ReadyStatus, create_routes};
