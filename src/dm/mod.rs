//! Direct Messaging Module
//!
//! Orchestrates the two halves of a DM send: durable persistence through
//! the social repository, then live fan-out through the connection hub.
//!
//! # Module Structure
//!
//! ```text
//! dm/
//! ├── mod.rs      - module exports
//! ├── service.rs  - persist-then-broadcast orchestration
//! └── handlers.rs - HTTP handlers for send, history, and conversations
//! ```

pub mod handlers;
pub mod service;

pub use service::DmService;
