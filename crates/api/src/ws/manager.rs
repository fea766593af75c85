use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use linewatch_core::topics::FeedTopic;
use tokio::sync::{mpsc, RwLock};

/// Outbound queue depth per subscriber. A subscriber that falls this far
/// behind is disconnected rather than allowed to stall the feed.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 32;

/// Channel sender half for pushing frames to one subscriber.
pub type FeedSender = mpsc::Sender<Message>;

/// A single feed subscription.
pub struct FeedSubscriber {
    /// Channel sender for outbound frames to this connection.
    pub sender: FeedSender,
}

/// Manages all active feed subscriptions, keyed by topic then
/// connection id.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc`
/// and shared across the application.
pub struct FeedManager {
    feeds: RwLock<HashMap<FeedTopic, HashMap<String, FeedSubscriber>>>,
}

impl FeedManager {
    /// Create a new, empty manager.
    pub fn new() -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
        }
    }

    /// Register a subscription.
    ///
    /// Returns the receiver half of the bounded frame channel so the
    /// caller can forward frames to the WebSocket sink.
    pub async fn subscribe(&self, topic: FeedTopic, conn_id: String) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.feeds
            .write()
            .await
            .entry(topic)
            .or_default()
            .insert(conn_id, FeedSubscriber { sender: tx });
        rx
    }

    /// Remove a subscription by connection id.
    pub async fn unsubscribe(&self, topic: FeedTopic, conn_id: &str) {
        let mut feeds = self.feeds.write().await;
        if let Some(subscribers) = feeds.get_mut(&topic) {
            subscribers.remove(conn_id);
            if subscribers.is_empty() {
                feeds.remove(&topic);
            }
        }
    }

    /// Number of subscribers on one topic.
    pub async fn subscriber_count(&self, topic: FeedTopic) -> usize {
        self.feeds
            .read()
            .await
            .get(&topic)
            .map_or(0, HashMap::len)
    }

    /// Total number of subscriptions across all topics.
    pub async fn total_count(&self) -> usize {
        self.feeds.read().await.values().map(HashMap::len).sum()
    }

    /// Push a frame to every subscriber on a topic.
    ///
    /// Subscribers whose queues are full or closed are removed so one
    /// slow client never blocks delivery to the others. Returns the
    /// connection ids that were removed.
    pub async fn broadcast_to(&self, topic: FeedTopic, message: Message) -> Vec<String> {
        let mut feeds = self.feeds.write().await;
        let Some(subscribers) = feeds.get_mut(&topic) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        subscribers.retain(|conn_id, subscriber| {
            match subscriber.sender.try_send(message.clone()) {
                Ok(()) => true,
                Err(_) => {
                    removed.push(conn_id.clone());
                    false
                }
            }
        });
        if subscribers.is_empty() {
            feeds.remove(&topic);
        }

        if !removed.is_empty() {
            tracing::warn!(topic = %topic, count = removed.len(), "Dropped stalled feed subscribers");
        }
        removed
    }

    /// Send a Ping frame to every subscriber on every topic.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let feeds = self.feeds.read().await;
        for subscribers in feeds.values() {
            for subscriber in subscribers.values() {
                let _ = subscriber.sender.try_send(Message::Ping(Bytes::new()));
            }
        }
    }

    /// Send a Close frame to every subscriber, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut feeds = self.feeds.write().await;
        let count: usize = feeds.values().map(HashMap::len).sum();
        for subscribers in feeds.values() {
            for subscriber in subscribers.values() {
                let _ = subscriber.sender.try_send(Message::Close(None));
            }
        }
        feeds.clear();
        tracing::info!(count, "Closed all feed subscriptions");
    }
}

impl Default for FeedManager {
    fn default() -> Self {
        Self::new()
    }
}
