//! Social Repository
//!
//! All persisted social state lives here: feed posts, likes, reposts,
//! profiles, the connection graph, and direct-message records. The
//! repository is the only writer to the table on the backend's behalf and
//! decodes every item into a typed [`Record`] at this boundary.
//!
//! # Consistency Notes
//!
//! `create_post` and `send_dm` perform multiple independent puts with no
//! transaction. A partial failure after the feed write but before the
//! mapping write leaves the post visible in the feed but unlikeable until
//! retried; the missing-mapping branches in `toggle_like`/`repost` keep that
//! state from surfacing as an error, and it self-heals on the next
//! successful write path.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::Error;
use crate::store::{Item, ItemKey, PutOutcome, ScanFilter, StoreError, TableStore};

use super::keys::{self, FEED_MAP_SK, FEED_PK, PROFILE_SK};
use super::records::{
    ConnectionEdge, ConversationSummary, DmMessage, DmPointer, FeedMap, Like, Post, Profile,
    Record, RepostAudit, UserPostRef, UserSummary,
};

/// One page of the global feed
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<Post>,
    /// Opaque cursor for the next page, `None` when the feed is exhausted
    pub next: Option<String>,
}

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
}

/// Repository over the single-table store
#[derive(Clone)]
pub struct SocialRepo {
    store: Arc<dyn TableStore>,
}

impl SocialRepo {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Create a post: feed item, author-index item, and id -> key mapping
    ///
    /// Text is truncated to 1000 characters. The three writes are
    /// independent puts; see the module notes on partial failure.
    pub async fn create_post(
        &self,
        author_sub: &str,
        author_name: &str,
        text: &str,
    ) -> Result<Post, Error> {
        let post_id = Uuid::new_v4().to_string();
        let ts = keys::now_iso();
        let feed_key = ItemKey::new(FEED_PK, keys::feed_post_sk(&ts, &post_id));

        let post = Post {
            post_id: post_id.clone(),
            author_sub: author_sub.to_string(),
            author_name: author_name.to_string(),
            text: truncate_chars(text, 1000),
            like_count: 0,
            repost_count: 0,
            created_at: ts.clone(),
        };

        self.put_record(feed_key.clone(), Record::Post(post.clone())).await?;
        self.put_record(
            ItemKey::new(keys::user_pk(author_sub), keys::feed_post_sk(&ts, &post_id)),
            Record::UserPost(UserPostRef {
                ref_pk: feed_key.pk.clone(),
                ref_sk: feed_key.sk.clone(),
            }),
        )
        .await?;
        self.put_record(
            ItemKey::new(keys::post_pk(&post_id), FEED_MAP_SK),
            Record::FeedMap(FeedMap {
                feed_pk: feed_key.pk,
                feed_sk: feed_key.sk,
            }),
        )
        .await?;

        Ok(post)
    }

    /// Read the global feed, newest first
    ///
    /// The cursor is the `pk|sk` of the last returned key; an unparseable
    /// cursor is ignored and the read restarts from the top.
    pub async fn list_feed(&self, limit: usize, cursor: Option<&str>) -> Result<FeedPage, Error> {
        let start_after = cursor.and_then(parse_cursor);
        let page = self
            .store
            .query(FEED_PK, "POST#", limit, false, start_after)
            .await?;

        let mut items = Vec::with_capacity(page.items.len());
        for item in &page.items {
            match decode(item)? {
                Record::Post(post) => items.push(post),
                other => {
                    return Err(unexpected_record(&item.key, &other));
                }
            }
        }

        Ok(FeedPage {
            items,
            next: page.next.map(|key| encode_cursor(&key)),
        })
    }

    /// Toggle a like: conditional create, delete on conflict
    ///
    /// The conditional create's two-outcome result drives the branch; no
    /// error is ever used as control flow. When the id -> feed mapping is
    /// missing the toggle still registers, but the counter update is
    /// skipped.
    pub async fn toggle_like(&self, post_id: &str, user_sub: &str) -> Result<LikeOutcome, Error> {
        let like_key = ItemKey::new(keys::post_pk(post_id), keys::like_sk(user_sub));
        let like_item = encode(like_key.clone(), Record::Like(Like { ts: keys::now_iso() }))?;

        let liked = match self.store.put_item_if_absent(like_item).await? {
            PutOutcome::Created => true,
            PutOutcome::AlreadyExists => {
                self.store.delete_item(&like_key.pk, &like_key.sk).await?;
                false
            }
        };

        if let Some(feed_key) = self.feed_key_for_post(post_id).await? {
            let delta = if liked { 1 } else { -1 };
            self.store
                .update_counter(&feed_key.pk, &feed_key.sk, "like_count", delta)
                .await?;
        } else {
            tracing::debug!(post_id, "like toggled without feed mapping; counter skipped");
        }

        Ok(LikeOutcome { liked })
    }

    /// Repost: bump the counter and append an audit record
    ///
    /// Deliberately not idempotent - repeated reposts by the same user each
    /// increment the counter.
    pub async fn repost(&self, post_id: &str, user_sub: &str) -> Result<(), Error> {
        if let Some(feed_key) = self.feed_key_for_post(post_id).await? {
            self.store
                .update_counter(&feed_key.pk, &feed_key.sk, "repost_count", 1)
                .await?;
        } else {
            tracing::debug!(post_id, "repost without feed mapping; counter skipped");
        }

        let ts = keys::now_iso();
        self.put_record(
            ItemKey::new(keys::user_pk(user_sub), keys::repost_sk(post_id, &ts)),
            Record::Repost(RepostAudit { created_at: ts }),
        )
        .await
    }

    /// Unconditional profile overwrite, last writer wins
    pub async fn upsert_profile(
        &self,
        sub: &str,
        email: &str,
        given_name: Option<&str>,
    ) -> Result<(), Error> {
        self.put_record(
            ItemKey::new(keys::user_pk(sub), PROFILE_SK),
            Record::Profile(Profile {
                email: email.to_string(),
                given_name: given_name.unwrap_or("").to_string(),
                updated_at: keys::now_iso(),
            }),
        )
        .await
    }

    /// Fetch a profile; an absent profile yields empty fields
    pub async fn get_profile(&self, sub: &str) -> Result<UserSummary, Error> {
        let item = self.store.get_item(&keys::user_pk(sub), PROFILE_SK).await?;
        let (email, given_name) = match item {
            Some(item) => match decode(&item)? {
                Record::Profile(profile) => (profile.email, profile.given_name),
                other => return Err(unexpected_record(&item.key, &other)),
            },
            None => (String::new(), String::new()),
        };
        Ok(UserSummary {
            sub: sub.to_string(),
            email,
            given_name,
        })
    }

    /// Case-insensitive substring search over profile records
    ///
    /// Scan-based and not indexed; acceptable only at small scale.
    pub async fn search_users_local(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<UserSummary>, Error> {
        let q = query.to_lowercase();
        let filter: ScanFilter = Box::new(move |item| {
            if item.key.sk != PROFILE_SK {
                return false;
            }
            let email = item.body.get("email").and_then(|v| v.as_str()).unwrap_or("");
            let given = item
                .body
                .get("given_name")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            email.to_lowercase().contains(&q)
                || given.to_lowercase().contains(&q)
                || item.key.pk.to_lowercase().contains(&q)
        });

        let items = self.store.scan(filter, limit).await?;
        let mut out = Vec::with_capacity(items.len());
        for item in &items {
            match decode(item)? {
                Record::Profile(profile) => out.push(UserSummary {
                    sub: keys::key_value(&item.key.pk).to_string(),
                    email: profile.email,
                    given_name: profile.given_name,
                }),
                other => return Err(unexpected_record(&item.key, &other)),
            }
        }
        Ok(out)
    }

    /// Write both halves of the mirrored connection edge; idempotent
    pub async fn connect_users(&self, a_sub: &str, b_sub: &str) -> Result<(), Error> {
        let now = keys::now_iso();
        self.put_record(
            ItemKey::new(keys::user_pk(a_sub), keys::conn_sk(b_sub)),
            Record::Conn(ConnectionEdge { created_at: now.clone() }),
        )
        .await?;
        self.put_record(
            ItemKey::new(keys::user_pk(b_sub), keys::conn_sk(a_sub)),
            Record::Conn(ConnectionEdge { created_at: now }),
        )
        .await
    }

    /// Subjects this user is connected to
    pub async fn list_connections(&self, sub: &str, limit: usize) -> Result<Vec<String>, Error> {
        let page = self
            .store
            .query(&keys::user_pk(sub), "CONN#", limit, false, None)
            .await?;
        Ok(page
            .items
            .iter()
            .map(|item| keys::key_value(&item.key.sk).to_string())
            .collect())
    }

    /// Persist a direct message and bump both participants' pointers
    ///
    /// Text is truncated to 2000 characters. The message record is written
    /// first; the pointer writes are independent puts.
    pub async fn send_dm(
        &self,
        sender_sub: &str,
        receiver_sub: &str,
        text: &str,
    ) -> Result<DmMessage, Error> {
        let cid = keys::conversation_id(sender_sub, receiver_sub);
        let ts = keys::now_iso();
        let msg_id = Uuid::new_v4().to_string();

        let message = DmMessage {
            sender_sub: sender_sub.to_string(),
            receiver_sub: receiver_sub.to_string(),
            text: truncate_chars(text, 2000),
            created_at: ts.clone(),
            msg_id: msg_id.clone(),
        };

        self.put_record(
            ItemKey::new(keys::dm_pk(&cid), keys::dm_msg_sk(&ts, &msg_id)),
            Record::Dm(message.clone()),
        )
        .await?;

        for sub in [sender_sub, receiver_sub] {
            self.put_record(
                ItemKey::new(keys::user_pk(sub), keys::dm_ptr_sk(&cid)),
                Record::DmPtr(DmPointer { updated_at: ts.clone() }),
            )
            .await?;
        }

        Ok(message)
    }

    /// Conversation history, newest first
    pub async fn list_dm(
        &self,
        sub_a: &str,
        sub_b: &str,
        limit: usize,
    ) -> Result<Vec<DmMessage>, Error> {
        let cid = keys::conversation_id(sub_a, sub_b);
        let page = self
            .store
            .query(&keys::dm_pk(&cid), "MSG#", limit, false, None)
            .await?;

        let mut out = Vec::with_capacity(page.items.len());
        for item in &page.items {
            match decode(item)? {
                Record::Dm(message) => out.push(message),
                other => return Err(unexpected_record(&item.key, &other)),
            }
        }
        Ok(out)
    }

    /// The caller's conversations with peer name and last-message summary
    ///
    /// Walks the caller's pointer records, derives the peer by
    /// set-difference on the participant pair, and falls back to the
    /// pointer's own update time when no message is found (a defensive
    /// branch for inconsistent state).
    pub async fn list_dm_conversations(
        &self,
        sub: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, Error> {
        let pointers = self
            .store
            .query(&keys::user_pk(sub), "DM#", limit, false, None)
            .await?;

        let mut summaries = Vec::with_capacity(pointers.items.len());
        for item in &pointers.items {
            let pointer = match decode(item)? {
                Record::DmPtr(pointer) => pointer,
                other => return Err(unexpected_record(&item.key, &other)),
            };

            let cid = keys::key_value(&item.key.sk);
            let (a, b) = keys::split_conversation_id(cid).ok_or_else(|| {
                Error::Store(StoreError::Rejected(format!(
                    "malformed conversation id '{cid}'"
                )))
            })?;
            let peer = if a == sub { b } else { a };

            let newest = self
                .store
                .query(&keys::dm_pk(cid), "MSG#", 1, false, None)
                .await?;
            let last = match newest.items.first() {
                Some(item) => match decode(item)? {
                    Record::Dm(message) => Some(message),
                    other => return Err(unexpected_record(&item.key, &other)),
                },
                None => None,
            };

            let profile = self.get_profile(peer).await?;
            summaries.push(ConversationSummary {
                peer_sub: peer.to_string(),
                peer_name: profile.display_name().to_string(),
                last_text: last.as_ref().map(|m| m.text.clone()).unwrap_or_default(),
                last_at: last
                    .map(|m| m.created_at)
                    .unwrap_or(pointer.updated_at),
            });
        }

        summaries.sort_by(|x, y| y.last_at.cmp(&x.last_at));
        Ok(summaries)
    }

    /// Resolve a post id to the canonical feed key via the mapping item
    async fn feed_key_for_post(&self, post_id: &str) -> Result<Option<ItemKey>, Error> {
        let item = self
            .store
            .get_item(&keys::post_pk(post_id), FEED_MAP_SK)
            .await?;
        match item {
            Some(item) => match decode(&item)? {
                Record::FeedMap(map) => Ok(Some(ItemKey::new(map.feed_pk, map.feed_sk))),
                other => Err(unexpected_record(&item.key, &other)),
            },
            None => Ok(None),
        }
    }

    async fn put_record(&self, key: ItemKey, record: Record) -> Result<(), Error> {
        let item = encode(key, record)?;
        self.store.put_item(item).await?;
        Ok(())
    }
}

fn encode(key: ItemKey, record: Record) -> Result<Item, Error> {
    let body = serde_json::to_value(&record)
        .map_err(|e| Error::Store(StoreError::Rejected(format!("encode failed: {e}"))))?;
    Ok(Item::new(key, body))
}

fn decode(item: &Item) -> Result<Record, Error> {
    serde_json::from_value(item.body.clone()).map_err(|e| {
        Error::Store(StoreError::Rejected(format!(
            "corrupt item {}/{}: {e}",
            item.key.pk, item.key.sk
        )))
    })
}

fn unexpected_record(key: &ItemKey, record: &Record) -> Error {
    Error::Store(StoreError::Rejected(format!(
        "unexpected '{}' record at {}/{}",
        record.kind(),
        key.pk,
        key.sk
    )))
}

fn encode_cursor(key: &ItemKey) -> String {
    format!("{}|{}", key.pk, key.sk)
}

fn parse_cursor(cursor: &str) -> Option<ItemKey> {
    cursor
        .split_once('|')
        .map(|(pk, sk)| ItemKey::new(pk, sk))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn repo() -> SocialRepo {
        SocialRepo::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_post_writes_mapping_that_resolves() {
        let repo = repo();
        let post = repo.create_post("alice", "Alice", "hello").await.unwrap();

        let feed_key = repo.feed_key_for_post(&post.post_id).await.unwrap().unwrap();
        assert_eq!(feed_key.pk, FEED_PK);
        assert!(feed_key.sk.ends_with(&post.post_id));

        let feed = repo.list_feed(10, None).await.unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].post_id, post.post_id);
        assert_eq!(feed.items[0].like_count, 0);
    }

    #[tokio::test]
    async fn test_create_post_truncates_text() {
        let repo = repo();
        let long = "x".repeat(1500);
        let post = repo.create_post("alice", "Alice", &long).await.unwrap();
        assert_eq!(post.text.chars().count(), 1000);
    }

    #[tokio::test]
    async fn test_feed_pagination() {
        let repo = repo();
        for i in 0..25 {
            repo.create_post("alice", "Alice", &format!("post {i}")).await.unwrap();
        }

        let first = repo.list_feed(20, None).await.unwrap();
        assert_eq!(first.items.len(), 20);
        let cursor = first.next.expect("cursor for remaining page");

        let rest = repo.list_feed(20, Some(&cursor)).await.unwrap();
        assert_eq!(rest.items.len(), 5);
        assert!(rest.next.is_none());
    }

    #[tokio::test]
    async fn test_feed_ignores_malformed_cursor() {
        let repo = repo();
        repo.create_post("alice", "Alice", "hello").await.unwrap();
        let page = repo.list_feed(10, Some("garbage-without-separator")).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_like_twice_returns_to_original_count() {
        let repo = repo();
        let post = repo.create_post("alice", "Alice", "hello").await.unwrap();

        let first = repo.toggle_like(&post.post_id, "bob").await.unwrap();
        assert!(first.liked);
        let feed = repo.list_feed(10, None).await.unwrap();
        assert_eq!(feed.items[0].like_count, 1);

        let second = repo.toggle_like(&post.post_id, "bob").await.unwrap();
        assert!(!second.liked);
        let feed = repo.list_feed(10, None).await.unwrap();
        assert_eq!(feed.items[0].like_count, 0);
    }

    #[tokio::test]
    async fn test_toggle_like_without_mapping_skips_counter() {
        let repo = repo();
        // No post exists; the like still registers presence.
        let out = repo.toggle_like("ghost", "bob").await.unwrap();
        assert!(out.liked);
        let out = repo.toggle_like("ghost", "bob").await.unwrap();
        assert!(!out.liked);
    }

    #[tokio::test]
    async fn test_repost_is_not_idempotent() {
        let repo = repo();
        let post = repo.create_post("alice", "Alice", "hello").await.unwrap();

        repo.repost(&post.post_id, "bob").await.unwrap();
        repo.repost(&post.post_id, "bob").await.unwrap();

        let feed = repo.list_feed(10, None).await.unwrap();
        assert_eq!(feed.items[0].repost_count, 2);
    }

    #[tokio::test]
    async fn test_profile_upsert_last_writer_wins() {
        let repo = repo();
        repo.upsert_profile("s1", "old@x.io", Some("Old")).await.unwrap();
        repo.upsert_profile("s1", "new@x.io", Some("New")).await.unwrap();

        let profile = repo.get_profile("s1").await.unwrap();
        assert_eq!(profile.email, "new@x.io");
        assert_eq!(profile.given_name, "New");
    }

    #[tokio::test]
    async fn test_get_profile_missing_yields_empty_fields() {
        let repo = repo();
        let profile = repo.get_profile("nobody").await.unwrap();
        assert_eq!(profile.email, "");
        assert_eq!(profile.given_name, "");
        assert_eq!(profile.display_name(), "nobody");
    }

    #[tokio::test]
    async fn test_search_users_is_case_insensitive() {
        let repo = repo();
        repo.upsert_profile("s1", "Alice@Example.com", Some("Alice")).await.unwrap();
        repo.upsert_profile("s2", "bob@example.com", Some("Bob")).await.unwrap();

        let hits = repo.search_users_local("ALICE", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sub, "s1");

        let hits = repo.search_users_local("example", 10).await.unwrap();
        assert_eq!(hits.len(), 2);

        // Subject-id substring also matches.
        let hits = repo.search_users_local("S2", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sub, "s2");
    }

    #[tokio::test]
    async fn test_connect_users_mirrors_and_is_idempotent() {
        let repo = repo();
        repo.connect_users("alice", "bob").await.unwrap();
        repo.connect_users("alice", "bob").await.unwrap();

        assert_eq!(repo.list_connections("alice", 10).await.unwrap(), vec!["bob"]);
        assert_eq!(repo.list_connections("bob", 10).await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_send_dm_truncates_and_lists_descending() {
        let repo = repo();
        let long = "y".repeat(2500);
        let sent = repo.send_dm("alice", "bob", &long).await.unwrap();
        assert_eq!(sent.text.chars().count(), 2000);

        for i in 0..5 {
            repo.send_dm("bob", "alice", &format!("msg {i}")).await.unwrap();
        }

        let history = repo.list_dm("alice", "bob", 10).await.unwrap();
        assert_eq!(history.len(), 6);
        for pair in history.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_list_dm_is_commutative_over_participants() {
        let repo = repo();
        repo.send_dm("alice", "bob", "hi").await.unwrap();

        let ab = repo.list_dm("alice", "bob", 10).await.unwrap();
        let ba = repo.list_dm("bob", "alice", 10).await.unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab[0].text, "hi");
    }

    #[tokio::test]
    async fn test_conversation_summaries() {
        let repo = repo();
        repo.upsert_profile("bob", "bob@x.io", Some("Bob")).await.unwrap();
        repo.send_dm("alice", "bob", "hi bob").await.unwrap();
        repo.send_dm("carol", "alice", "hi alice").await.unwrap();

        let convs = repo.list_dm_conversations("alice", 10).await.unwrap();
        assert_eq!(convs.len(), 2);

        let with_bob = convs.iter().find(|c| c.peer_sub == "bob").unwrap();
        assert_eq!(with_bob.peer_name, "Bob");
        assert_eq!(with_bob.last_text, "hi bob");

        // carol has no profile: display name falls back to the subject id.
        let with_carol = convs.iter().find(|c| c.peer_sub == "carol").unwrap();
        assert_eq!(with_carol.peer_name, "carol");
    }

    #[tokio::test]
    async fn test_conversation_summary_falls_back_to_pointer_time() {
        let store: Arc<dyn TableStore> = Arc::new(MemoryStore::new());
        let repo = SocialRepo::new(store.clone());

        // Pointer without any message record: inconsistent state the
        // summary path must tolerate.
        let cid = keys::conversation_id("alice", "bob");
        store
            .put_item(
                encode(
                    ItemKey::new(keys::user_pk("alice"), keys::dm_ptr_sk(&cid)),
                    Record::DmPtr(DmPointer { updated_at: "2024-06-01T12:00:00".into() }),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let convs = repo.list_dm_conversations("alice", 10).await.unwrap();
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].last_at, "2024-06-01T12:00:00");
        assert_eq!(convs[0].last_text, "");
    }
}
