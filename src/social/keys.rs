//! Key Scheme
//!
//! Helpers composing the `TYPE#value` partition and sort keys used across
//! the single table. The scheme is append-only and treated as a compatibility
//! surface: no key renames.
//!
//! Layout:
//!
//! ```text
//! APP#FEED          / POST#<ts>#<id>       canonical feed post (owns counts)
//! USER#<sub>        / POST#<ts>#<id>       author index entry
//! POST#<id>         / MAP#FEED             id -> feed key mapping
//! POST#<id>         / LIKE#<sub>           like existence record
//! USER#<sub>        / PROFILE#MAIN         profile
//! USER#<sub>        / CONN#<sub>           connection edge (mirrored)
//! USER#<sub>        / REPOST#<post>#<ts>   repost audit record
//! DM#<cid>          / MSG#<ts>#<id>        direct message
//! USER#<sub>        / DM#<cid>             conversation pointer
//! USER#<sub>        / RUN#<ts>#<id>        assistant run
//! USER#<sub>        / RATE#<key>#<bucket>  hourly rate counter
//! ```

use chrono::Utc;

/// Global feed partition key
pub const FEED_PK: &str = "APP#FEED";

/// Sort key of the id -> feed key mapping item
pub const FEED_MAP_SK: &str = "MAP#FEED";

/// Sort key of the profile item within a user partition
pub const PROFILE_SK: &str = "PROFILE#MAIN";

/// Current UTC timestamp at second resolution
///
/// Second resolution means sort keys can tie under high write rates within
/// one partition; ties order by the uuid suffix.
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn user_pk(sub: &str) -> String {
    format!("USER#{sub}")
}

pub fn post_pk(post_id: &str) -> String {
    format!("POST#{post_id}")
}

pub fn feed_post_sk(ts: &str, post_id: &str) -> String {
    format!("POST#{ts}#{post_id}")
}

pub fn like_sk(user_sub: &str) -> String {
    format!("LIKE#{user_sub}")
}

pub fn conn_sk(peer_sub: &str) -> String {
    format!("CONN#{peer_sub}")
}

pub fn repost_sk(post_id: &str, ts: &str) -> String {
    format!("REPOST#{post_id}#{ts}")
}

pub fn dm_pk(conversation_id: &str) -> String {
    format!("DM#{conversation_id}")
}

pub fn dm_msg_sk(ts: &str, msg_id: &str) -> String {
    format!("MSG#{ts}#{msg_id}")
}

pub fn dm_ptr_sk(conversation_id: &str) -> String {
    format!("DM#{conversation_id}")
}

pub fn run_sk(ts: &str, run_id: &str) -> String {
    format!("RUN#{ts}#{run_id}")
}

pub fn rate_sk(key: &str, bucket: &str) -> String {
    format!("RATE#{key}#{bucket}")
}

/// Commutative conversation identifier for a pair of participants
///
/// The sorted, pipe-joined pair makes the id independent of who initiated:
/// `conversation_id(a, b) == conversation_id(b, a)`.
pub fn conversation_id(a: &str, b: &str) -> String {
    let mut pair = [a, b];
    pair.sort_unstable();
    pair.join("|")
}

/// Split a conversation id back into its participant pair
pub fn split_conversation_id(cid: &str) -> Option<(&str, &str)> {
    cid.split_once('|')
}

/// Strip the `TYPE#` prefix from a key segment, returning the value part
pub fn key_value(segment: &str) -> &str {
    match segment.split_once('#') {
        Some((_, value)) => value,
        None => segment,
    }
}
