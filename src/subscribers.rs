//! Subscriber directory
//!
//! The set of chats that receive activation notifications. Append-only from
//! the relay's point of view; removal is an operator concern.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe set of subscribed chat ids
#[derive(Clone)]
pub struct SubscriberDirectory {
    inner: Arc<RwLock<BTreeSet<i64>>>,
}

impl SubscriberDirectory {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeSet::new())),
        }
    }

    pub fn restore(subscribers: Vec<i64>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(subscribers.into_iter().collect())),
        }
    }

    /// Add a subscriber. Idempotent: returns false when already subscribed.
    pub async fn subscribe(&self, chat_id: i64) -> bool {
        let mut subscribers = self.inner.write().await;
        subscribers.insert(chat_id)
    }

    /// Copy of the current subscriber set, taken before any fan-out so chats
    /// subscribing mid-delivery never join an in-flight send.
    pub async fn snapshot(&self) -> Vec<i64> {
        let subscribers = self.inner.read().await;
        subscribers.iter().copied().collect()
    }

    pub async fn count(&self) -> usize {
        let subscribers = self.inner.read().await;
        subscribers.len()
    }
}

impl Default for SubscriberDirectory {
    fn default() -> Self {
        Self::new()
    }
}
