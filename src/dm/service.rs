//! DM Service
//!
//! The ordering here is the core correctness decision: a message is
//! persisted before any broadcast, so a client can never see a message via
//! push that it could not also retrieve via history. A broadcast that finds
//! zero live connections is not an error - the message is already durable.

use std::sync::Arc;

use crate::error::Error;
use crate::realtime::{ConnectionHub, PushEvent};
use crate::social::{ConversationSummary, DmMessage, SocialRepo};

/// Orchestrates persistence and live delivery of direct messages
#[derive(Clone)]
pub struct DmService {
    repo: SocialRepo,
    hub: Arc<ConnectionHub>,
}

impl DmService {
    pub fn new(repo: SocialRepo, hub: Arc<ConnectionHub>) -> Self {
        Self { repo, hub }
    }

    /// Persist a message, then push it to any live room members
    ///
    /// Repository errors surface unchanged and are not retried here;
    /// delivery results are logged, never raised.
    pub async fn send_and_deliver(
        &self,
        sender_sub: &str,
        receiver_sub: &str,
        text: &str,
    ) -> Result<DmMessage, Error> {
        let message = self.repo.send_dm(sender_sub, receiver_sub, text).await?;

        let report = self.hub.broadcast(
            sender_sub,
            receiver_sub,
            &PushEvent::Dm { item: message.clone() },
        );
        tracing::info!(
            sender = sender_sub,
            receiver = receiver_sub,
            delivered = report.delivered,
            pruned = report.pruned,
            "dm persisted and fanned out"
        );

        Ok(message)
    }

    /// Conversation history, newest first
    pub async fn history(
        &self,
        sub_a: &str,
        sub_b: &str,
        limit: usize,
    ) -> Result<Vec<DmMessage>, Error> {
        self.repo.list_dm(sub_a, sub_b, limit).await
    }

    /// The caller's conversation list with last-message summaries
    ///
    /// Reads straight from the repository; the hub is not consulted.
    pub async fn conversations(
        &self,
        sub: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, Error> {
        self.repo.list_dm_conversations(sub, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> (DmService, Arc<ConnectionHub>) {
        let repo = SocialRepo::new(Arc::new(MemoryStore::new()));
        let hub = Arc::new(ConnectionHub::new());
        (DmService::new(repo, hub.clone()), hub)
    }

    #[tokio::test]
    async fn test_send_persists_with_zero_live_connections() {
        let (service, _hub) = service();
        let sent = service.send_and_deliver("alice", "bob", "hi").await.unwrap();

        let history = service.history("alice", "bob", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].msg_id, sent.msg_id);
        assert_eq!(history[0].text, "hi");
    }

    #[tokio::test]
    async fn test_send_pushes_to_live_connection_and_is_recoverable() {
        let (service, hub) = service();
        let mut member = hub.attach("bob", "alice");

        service.send_and_deliver("alice", "bob", "hi").await.unwrap();

        let PushEvent::Dm { item } = member.receiver.try_recv().unwrap();
        assert_eq!(item.text, "hi");
        assert_eq!(item.sender_sub, "alice");

        // The pushed message is also the newest history entry.
        let history = service.history("alice", "bob", 10).await.unwrap();
        assert_eq!(history[0].msg_id, item.msg_id);
    }

    #[tokio::test]
    async fn test_both_room_members_receive_the_push() {
        let (service, hub) = service();
        let mut sender_side = hub.attach("alice", "bob");
        let mut receiver_side = hub.attach("bob", "alice");

        service.send_and_deliver("alice", "bob", "hi").await.unwrap();

        assert!(sender_side.receiver.try_recv().is_ok());
        assert!(receiver_side.receiver.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_conversations_reflect_latest_send() {
        let (service, _hub) = service();
        service.send_and_deliver("alice", "bob", "first").await.unwrap();
        service.send_and_deliver("bob", "alice", "second").await.unwrap();

        let convs = service.conversations("alice", 10).await.unwrap();
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].peer_sub, "bob");
        assert_eq!(convs[0].last_text, "second");
    }
}
