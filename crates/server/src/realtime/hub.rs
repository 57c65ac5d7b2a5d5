use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc;

use super::topic::{Event, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Connection manager for the broadcast layer.
///
/// Owns the only in-process mutable shared state: which connection is joined
/// to which topics. Join/disconnect/publish are its entire mutation surface.
/// The registry lock is never held across an await.
#[derive(Debug, Default)]
pub struct EventHub {
    next_id: AtomicU64,
    inner: Mutex<Registry>,
}

#[derive(Debug, Default)]
struct Registry {
    senders: HashMap<ConnectionId, mpsc::UnboundedSender<Event>>,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
    joined: HashMap<ConnectionId, HashSet<Topic>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns its event stream.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Event>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        let mut registry = self.inner.lock().expect("hub lock poisoned");
        registry.senders.insert(id, tx);
        registry.joined.insert(id, HashSet::new());

        (id, rx)
    }

    /// Adds the connection to a topic's recipient set. Joining twice is a
    /// no-op.
    pub fn join(&self, connection: ConnectionId, topic: Topic) {
        let mut registry = self.inner.lock().expect("hub lock poisoned");
        if !registry.senders.contains_key(&connection) {
            return;
        }
        registry.topics.entry(topic).or_default().insert(connection);
        registry
            .joined
            .entry(connection)
            .or_default()
            .insert(topic);
    }

    /// Removes the connection from every topic it had joined. No explicit
    /// leave message is required for correctness.
    pub fn disconnect(&self, connection: ConnectionId) {
        let mut registry = self.inner.lock().expect("hub lock poisoned");
        registry.senders.remove(&connection);
        if let Some(topics) = registry.joined.remove(&connection) {
            for topic in topics {
                if let Some(members) = registry.topics.get_mut(&topic) {
                    members.remove(&connection);
                    if members.is_empty() {
                        registry.topics.remove(&topic);
                    }
                }
            }
        }
    }

    /// Fire-and-forget delivery to every connection currently joined to
    /// `topic`. Returns the number of receivers; an empty recipient set is a
    /// normal, silent no-op.
    pub fn publish(&self, topic: Topic, event: Event) -> usize {
        let registry = self.inner.lock().expect("hub lock poisoned");
        let Some(members) = registry.topics.get(&topic) else {
            return 0;
        };

        let mut delivered = 0;
        for connection in members {
            if let Some(sender) = registry.senders.get(connection) {
                if sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }

        tracing::debug!(%topic, ?event, delivered, "published broadcast event");
        delivered
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        let registry = self.inner.lock().expect("hub lock poisoned");
        registry.topics.get(&topic).map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn publish_reaches_only_joined_topic() {
        let hub = EventHub::new();
        let board_a = Topic::Board(Uuid::new_v4());
        let board_b = Topic::Board(Uuid::new_v4());

        let (conn_a, mut rx_a) = hub.connect();
        let (conn_b, mut rx_b) = hub.connect();
        hub.join(conn_a, board_a);
        hub.join(conn_b, board_b);

        assert_eq!(hub.publish(board_a, Event::Notify), 1);

        assert_eq!(rx_a.recv().await, Some(Event::Notify));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let hub = EventHub::new();
        let topic = Topic::Board(Uuid::new_v4());
        let (conn, mut rx) = hub.connect();
        hub.join(conn, topic);

        hub.publish(topic, Event::UpdateColumnOrder);
        hub.publish(topic, Event::Notify);

        assert_eq!(rx.recv().await, Some(Event::UpdateColumnOrder));
        assert_eq!(rx.recv().await, Some(Event::Notify));
    }

    #[tokio::test]
    async fn publish_to_empty_topic_is_noop() {
        let hub = EventHub::new();
        assert_eq!(hub.publish(Topic::User(Uuid::new_v4()), Event::Notify), 0);
    }

    #[tokio::test]
    async fn disconnect_cleans_up_all_memberships() {
        let hub = EventHub::new();
        let board = Topic::Board(Uuid::new_v4());
        let user = Topic::User(Uuid::new_v4());

        let (conn, _rx) = hub.connect();
        hub.join(conn, board);
        hub.join(conn, user);
        assert_eq!(hub.subscriber_count(board), 1);

        hub.disconnect(conn);
        assert_eq!(hub.subscriber_count(board), 0);
        assert_eq!(hub.subscriber_count(user), 0);
        assert_eq!(hub.publish(board, Event::Notify), 0);
    }

    #[tokio::test]
    async fn join_after_disconnect_is_ignored() {
        let hub = EventHub::new();
        let topic = Topic::Board(Uuid::new_v4());
        let (conn, _rx) = hub.connect();
        hub.disconnect(conn);
        hub.join(conn, topic);
        assert_eq!(hub.subscriber_count(topic), 0);
    }

    #[tokio::test]
    async fn user_topic_reaches_every_device_of_that_user() {
        let hub = EventHub::new();
        let user = Topic::User(Uuid::new_v4());
        let other_user = Topic::User(Uuid::new_v4());

        let (laptop, mut rx_laptop) = hub.connect();
        let (phone, mut rx_phone) = hub.connect();
        let (stranger, mut rx_stranger) = hub.connect();
        hub.join(laptop, user);
        hub.join(phone, user);
        hub.join(stranger, other_user);

        assert_eq!(hub.publish(user, Event::Notify), 2);
        assert_eq!(rx_laptop.recv().await, Some(Event::Notify));
        assert_eq!(rx_phone.recv().await, Some(Event::Notify));
        assert!(rx_stranger.try_recv().is_err());
    }

    #[tokio::test]
    async fn one_topic_fans_out_to_all_members() {
        let hub = EventHub::new();
        let topic = Topic::Workspace(Uuid::new_v4());

        let (a, mut rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        hub.join(a, topic);
        hub.join(b, topic);

        let event = Event::NewMember("ann".to_string());
        assert_eq!(hub.publish(topic, event.clone()), 2);
        assert_eq!(rx_a.recv().await, Some(event.clone()));
        assert_eq!(rx_b.recv().await, Some(event));
    }
}
