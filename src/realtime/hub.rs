//! Connection Hub
//!
//! In-memory registry of live realtime connections grouped by conversation
//! room. The hub is the only component whose state is shared across
//! concurrently executing connections, so every structural mutation
//! (attach, detach, prune-on-failure) and every broadcast iteration runs
//! under one coarse lock over the room map.
//!
//! Room lifecycle: a room is created on first attach to its conversation id
//! and removed entirely when its last member leaves - whether by detach or
//! by being pruned after a failed delivery. Re-attaching after that starts
//! a fresh room, never a stale one.
//!
//! Delivery is fire-and-forget per connection: a member that cannot receive
//! is treated as dead, removed from the room immediately, and never aborts
//! delivery to the rest. There is no acknowledgment, no retry, and no
//! cross-recipient ordering guarantee beyond the set's iteration order. The
//! hub never blocks on a slow consumer beyond the single send attempt.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::social::keys::conversation_id;

use super::PushEvent;

/// Opaque identifier for one attached connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

/// A registered room membership handed back by [`ConnectionHub::attach`]
///
/// Dropping the receiver without detaching is safe: the next broadcast
/// prunes the dead member.
pub struct RoomMember {
    pub connection_id: ConnectionId,
    pub receiver: mpsc::UnboundedReceiver<PushEvent>,
}

/// Result of one fan-out, exposed for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Members the payload was handed to
    pub delivered: usize,
    /// Dead members removed during this fan-out
    pub pruned: usize,
}

type Room = HashMap<ConnectionId, mpsc::UnboundedSender<PushEvent>>;

/// Registry of live connections per conversation room
///
/// Constructed once at startup and passed by handle to every
/// connection-accepting and message-sending entry point; there is no
/// module-level singleton.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    rooms: Mutex<HashMap<String, Room>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection in the room for this participant pair
    ///
    /// Callers must complete the transport handshake before attaching, so
    /// that registration is only ever visible to broadcasters once the
    /// connection can actually receive.
    pub fn attach(&self, me: &str, peer: &str) -> RoomMember {
        let room_id = conversation_id(me, peer);
        let connection_id = ConnectionId(Uuid::new_v4());
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut rooms = self.rooms.lock().expect("hub lock poisoned");
        rooms.entry(room_id.clone()).or_default().insert(connection_id, sender);
        tracing::debug!(room = %room_id, ?connection_id, "connection attached");

        RoomMember {
            connection_id,
            receiver,
        }
    }

    /// Remove a connection from its room, dropping the room when it empties
    pub fn detach(&self, connection_id: ConnectionId, me: &str, peer: &str) {
        let room_id = conversation_id(me, peer);
        let mut rooms = self.rooms.lock().expect("hub lock poisoned");
        let Some(room) = rooms.get_mut(&room_id) else {
            return;
        };
        room.remove(&connection_id);
        if room.is_empty() {
            rooms.remove(&room_id);
            tracing::debug!(room = %room_id, "room emptied and removed");
        }
    }

    /// Deliver a payload to every connection currently in the room
    pub fn broadcast(&self, a: &str, b: &str, event: &PushEvent) -> DeliveryReport {
        let room_id = conversation_id(a, b);
        let mut rooms = self.rooms.lock().expect("hub lock poisoned");
        let Some(room) = rooms.get_mut(&room_id) else {
            return DeliveryReport::default();
        };

        let mut report = DeliveryReport::default();
        let mut dead = Vec::new();
        for (connection_id, sender) in room.iter() {
            if sender.send(event.clone()).is_ok() {
                report.delivered += 1;
            } else {
                dead.push(*connection_id);
            }
        }
        for connection_id in dead {
            room.remove(&connection_id);
            report.pruned += 1;
        }
        if room.is_empty() {
            rooms.remove(&room_id);
        }

        tracing::debug!(
            room = %room_id,
            delivered = report.delivered,
            pruned = report.pruned,
            "broadcast fan-out"
        );
        report
    }

    /// Current member count for a participant pair's room
    pub fn room_size(&self, a: &str, b: &str) -> usize {
        let room_id = conversation_id(a, b);
        let rooms = self.rooms.lock().expect("hub lock poisoned");
        rooms.get(&room_id).map(|room| room.len()).unwrap_or(0)
    }

    /// Whether a room currently exists for this participant pair
    pub fn room_exists(&self, a: &str, b: &str) -> bool {
        let room_id = conversation_id(a, b);
        let rooms = self.rooms.lock().expect("hub lock poisoned");
        rooms.contains_key(&room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::DmMessage;

    fn event(text: &str) -> PushEvent {
        PushEvent::Dm {
            item: DmMessage {
                sender_sub: "alice".into(),
                receiver_sub: "bob".into(),
                text: text.into(),
                created_at: "2024-01-01T00:00:00".into(),
                msg_id: "m1".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        let hub = ConnectionHub::new();
        let mut first = hub.attach("alice", "bob");
        let mut second = hub.attach("bob", "alice");
        assert_eq!(hub.room_size("alice", "bob"), 2);

        let report = hub.broadcast("alice", "bob", &event("hi"));
        assert_eq!(report, DeliveryReport { delivered: 2, pruned: 0 });

        assert!(matches!(first.receiver.try_recv().unwrap(), PushEvent::Dm { .. }));
        assert!(matches!(second.receiver.try_recv().unwrap(), PushEvent::Dm { .. }));
    }

    #[tokio::test]
    async fn test_detach_narrows_delivery() {
        let hub = ConnectionHub::new();
        let first = hub.attach("alice", "bob");
        let mut second = hub.attach("bob", "alice");

        hub.detach(first.connection_id, "alice", "bob");
        let report = hub.broadcast("alice", "bob", &event("hi"));
        assert_eq!(report.delivered, 1);
        assert!(second.receiver.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_last_detach_removes_room() {
        let hub = ConnectionHub::new();
        let member = hub.attach("alice", "bob");
        assert!(hub.room_exists("alice", "bob"));

        hub.detach(member.connection_id, "alice", "bob");
        assert!(!hub.room_exists("bob", "alice"));

        // Re-attaching starts a fresh room, not a stale one.
        let _fresh = hub.attach("alice", "bob");
        assert_eq!(hub.room_size("alice", "bob"), 1);
    }

    #[tokio::test]
    async fn test_broadcast_prunes_dead_members_and_continues() {
        let hub = ConnectionHub::new();
        let dead = hub.attach("alice", "bob");
        let mut live = hub.attach("bob", "alice");

        // Dropping the receiver simulates a connection that fails mid-send.
        drop(dead.receiver);

        let report = hub.broadcast("alice", "bob", &event("hi"));
        assert_eq!(report, DeliveryReport { delivered: 1, pruned: 1 });
        assert!(live.receiver.try_recv().is_ok());
        assert_eq!(hub.room_size("alice", "bob"), 1);
    }

    #[tokio::test]
    async fn test_pruning_last_member_removes_room() {
        let hub = ConnectionHub::new();
        let only = hub.attach("alice", "bob");
        drop(only.receiver);

        let report = hub.broadcast("alice", "bob", &event("hi"));
        assert_eq!(report, DeliveryReport { delivered: 0, pruned: 1 });
        assert!(!hub.room_exists("alice", "bob"));
    }

    #[tokio::test]
    async fn test_broadcast_to_absent_room_is_a_noop() {
        let hub = ConnectionHub::new();
        let report = hub.broadcast("alice", "bob", &event("hi"));
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test]
    async fn test_rooms_are_commutative_over_participants() {
        let hub = ConnectionHub::new();
        let mut member = hub.attach("alice", "bob");

        // The peer's side addresses the same room.
        let report = hub.broadcast("bob", "alice", &event("hi"));
        assert_eq!(report.delivered, 1);
        assert!(member.receiver.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_rooms_do_not_cross_talk() {
        let hub = ConnectionHub::new();
        let mut ab = hub.attach("alice", "bob");
        let mut ac = hub.attach("alice", "carol");

        hub.broadcast("alice", "bob", &event("for bob's room"));
        assert!(ab.receiver.try_recv().is_ok());
        assert!(ac.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_attach_detach_and_broadcast() {
        use std::sync::Arc;

        let hub = Arc::new(ConnectionHub::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let member = hub.attach("alice", "bob");
                    hub.broadcast("alice", "bob", &event("x"));
                    hub.detach(member.connection_id, "alice", "bob");
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(!hub.room_exists("alice", "bob"));
    }
}
