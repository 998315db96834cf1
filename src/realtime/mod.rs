//! Realtime Module
//!
//! Live delivery of direct messages over WebSockets. The hub tracks which
//! connections are attached to which conversation room; the WebSocket
//! endpoint authenticates, attaches, and pumps pushed events to the client.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs - module exports and the push event payload
//! ├── hub.rs - room registry: attach, detach, fan-out broadcast
//! └── ws.rs  - WebSocket endpoint for one (caller, peer) pair
//! ```
//!
//! The channel is push-only from server to client: message sends arrive
//! through the HTTP surface and are fanned out via the hub; inbound frames
//! on the socket are ignored.

use serde::{Deserialize, Serialize};

use crate::social::DmMessage;

pub mod hub;
pub mod ws;

pub use hub::{ConnectionHub, ConnectionId, DeliveryReport, RoomMember};
pub use ws::ws_dm;

/// Payload pushed to room members
///
/// Serializes with a `type` tag; the DM variant renders as
/// `{"type": "dm", "item": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// A direct message was persisted and is being fanned out
    Dm { item: DmMessage },
}
