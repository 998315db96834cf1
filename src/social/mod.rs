//! Social Module
//!
//! Feed posts, likes, reposts, profiles, the connection graph, and
//! direct-message persistence, all modeled on one single-table store.
//!
//! # Module Structure
//!
//! ```text
//! social/
//! ├── mod.rs      - module exports and HTTP handlers re-export
//! ├── keys.rs     - composite key scheme and conversation ids
//! ├── records.rs  - tagged union of persisted item shapes
//! ├── repo.rs     - the repository (the table's only writer)
//! └── handlers.rs - HTTP handlers for the feed/users/connections surface
//! ```

pub mod handlers;
pub mod keys;
pub mod records;
pub mod repo;

pub use keys::conversation_id;
pub use records::{ConversationSummary, DmMessage, Post, Record, UserSummary};
pub use repo::{FeedPage, LikeOutcome, SocialRepo};
