//! Persisted Record Variants
//!
//! Every item in the table carries a `type` discriminator. This module
//! models the full set as one tagged union, decoded at the repository
//! boundary so nothing above the store handles untyped maps.
//!
//! Rate-bucket items are the one exception: they are counter-only items
//! written through `update_counter` and never decoded, so they have no
//! variant here.

use serde::{Deserialize, Serialize};

/// A post on the global feed
///
/// The feed copy is the single source of truth for the counters; the
/// author-index and mapping items only reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub author_sub: String,
    pub author_name: String,
    pub text: String,
    pub like_count: i64,
    pub repost_count: i64,
    pub created_at: String,
}

/// Author-index entry pointing at the canonical feed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPostRef {
    pub ref_pk: String,
    pub ref_sk: String,
}

/// id -> feed key mapping, lets like/repost locate the feed item without a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMap {
    pub feed_pk: String,
    pub feed_sk: String,
}

/// Like existence record; presence is the whole payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub ts: String,
}

/// User profile, upserted on every authenticated identity read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    pub updated_at: String,
}

/// One half of a mirrored connection edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    pub created_at: String,
}

/// Repost audit record under the reposting user's partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepostAudit {
    pub created_at: String,
}

/// A direct message, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmMessage {
    #[serde(rename = "from")]
    pub sender_sub: String,
    #[serde(rename = "to")]
    pub receiver_sub: String,
    pub text: String,
    pub created_at: String,
    pub msg_id: String,
}

/// Per-participant conversation pointer, bumped on every send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmPointer {
    pub updated_at: String,
}

/// Assistant run record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_type: String,
    pub status: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// The tagged union of every decoded item shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Post(Post),
    UserPost(UserPostRef),
    FeedMap(FeedMap),
    Like(Like),
    Profile(Profile),
    Conn(ConnectionEdge),
    Repost(RepostAudit),
    Dm(DmMessage),
    DmPtr(DmPointer),
    Run(Run),
}

impl Record {
    /// The `type` discriminator this variant serializes under
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::UserPost(_) => "user_post",
            Self::FeedMap(_) => "feed_map",
            Self::Like(_) => "like",
            Self::Profile(_) => "profile",
            Self::Conn(_) => "conn",
            Self::Repost(_) => "repost",
            Self::Dm(_) => "dm",
            Self::DmPtr(_) => "dm_ptr",
            Self::Run(_) => "run",
        }
    }
}

/// Compact user row returned by profile search and conversation summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub sub: String,
    pub email: String,
    pub given_name: String,
}

impl UserSummary {
    /// Display-name fallback chain: given name, then email, then subject id
    pub fn display_name(&self) -> &str {
        if !self.given_name.is_empty() {
            &self.given_name
        } else if !self.email.is_empty() {
            &self.email
        } else {
            &self.sub
        }
    }
}

/// One row of the caller's conversation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub peer_sub: String,
    pub peer_name: String,
    pub last_text: String,
    pub last_at: String,
}
