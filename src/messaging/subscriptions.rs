/// Subscription table
///
/// Maps (publisher, topic) to the set of subscriber ids. One lock covers
/// subscribe, unsubscribe and lookups alike.
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Composite key of a subscription: topic names are scoped by publisher
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey {
    pub publisher_id: String,
    pub topic: String,
}

impl SubscriptionKey {
    pub fn new(publisher_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            topic: topic.into(),
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.publisher_id, self.topic)
    }
}

/// What an unsubscribe request found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Removed,
    /// The key exists but this subscriber is not in it
    NotSubscribed,
    /// Nobody ever subscribed to the key
    NoSubscribers,
}

#[derive(Default)]
pub struct SubscriptionTable {
    entries: RwLock<HashMap<SubscriptionKey, HashSet<String>>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber, returns false if it was already present
    pub fn subscribe(&self, subscriber_id: &str, key: SubscriptionKey) -> bool {
        self.entries
            .write()
            .entry(key)
            .or_default()
            .insert(subscriber_id.to_string())
    }

    pub fn unsubscribe(&self, subscriber_id: &str, key: &SubscriptionKey) -> UnsubscribeOutcome {
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(subscribers) => {
                if subscribers.remove(subscriber_id) {
                    UnsubscribeOutcome::Removed
                } else {
                    UnsubscribeOutcome::NotSubscribed
                }
            }
            None => UnsubscribeOutcome::NoSubscribers,
        }
    }

    /// Snapshot of the current subscribers of a key, sorted
    pub fn subscribers(&self, key: &SubscriptionKey) -> Vec<String> {
        let mut subscribers: Vec<String> = self
            .entries
            .read()
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        subscribers.sort();
        subscribers
    }

    pub fn is_subscribed(&self, subscriber_id: &str, key: &SubscriptionKey) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|set| set.contains(subscriber_id))
    }

    /// Total number of (subscriber, key) pairs
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every key with its subscribers, sorted for display
    pub fn snapshot(&self) -> Vec<(SubscriptionKey, Vec<String>)> {
        let entries = self.entries.read();
        let mut snapshot: Vec<(SubscriptionKey, Vec<String>)> = entries
            .iter()
            .map(|(key, set)| {
                let mut subscribers: Vec<String> = set.iter().cloned().collect();
                subscribers.sort();
                (key.clone(), subscribers)
            })
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
