//! Topic router
//!
//! The router's index is keyed by concrete topic *name*, not by filter: a
//! `TopicSubscribers` entry only exists for a topic once something has been
//! published to it. The entry is populated lazily, by scanning every live
//! session's own filter trie once and caching the result; after that,
//! subscribe/unsubscribe keep already-known topics in sync directly.
//!
//! This is a deliberate departure from a single shared filter trie: a filter
//! trie needs collecting a match set on every publish, while this index
//! trades O(sessions) amortized backfill cost (paid once per topic, on its
//! first publish) for O(1) lookups on every publish after that.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::session::SessionStore;
use crate::topic::{topic_matches_filter, Subscription};

/// Subscribers currently known for one concrete topic name.
pub struct TopicSubscribers {
    subscribers: RwLock<Vec<Subscription>>,
}

impl TopicSubscribers {
    fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    fn insert(&self, sub: Subscription) {
        let mut subs = self.subscribers.write();
        subs.retain(|s| s.client_id != sub.client_id);
        subs.push(sub);
    }

    fn remove(&self, client_id: &str) {
        self.subscribers
            .write()
            .retain(|s| s.client_id.as_ref() != client_id);
    }

    /// Snapshot the current subscriber list.
    pub fn subscribers(&self) -> Vec<Subscription> {
        self.subscribers.read().clone()
    }
}

/// Routes published messages to the sessions subscribed to their topic.
pub struct Router {
    topics: DashMap<Arc<str>, Arc<TopicSubscribers>>,
    sessions: Arc<SessionStore>,
}

impl Router {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self {
            topics: DashMap::new(),
            sessions,
        }
    }

    /// Return the subscribers for a topic name, creating and backfilling the
    /// entry from every live session's filter trie if this is the first time
    /// anything has been published to it.
    pub fn subscribers_for(&self, topic: &str) -> Arc<TopicSubscribers> {
        if let Some(existing) = self.topics.get(topic) {
            return existing.clone();
        }

        let entry = Arc::new(TopicSubscribers::new());
        for session in self.sessions.iter() {
            let session = session.read();
            session.filter_trie.matches(topic, |sub| entry.insert(sub.clone()));
        }

        self.topics
            .entry(topic.into())
            .or_insert_with(|| entry.clone())
            .clone()
    }

    /// Record a new subscription against every topic name already known to
    /// the router. Topics not yet seen will pick this subscription up the
    /// first time `subscribers_for` backfills them.
    pub fn subscribe(&self, filter: &str, sub: &Subscription) {
        for topic in self.topics.iter() {
            if topic_matches_filter(topic.key(), filter) {
                topic.value().insert(sub.clone());
            }
        }
    }

    /// Remove a client's subscription from every known topic.
    pub fn unsubscribe(&self, client_id: &str, _filter: &str) {
        for topic in self.topics.iter() {
            topic.value().remove(client_id);
        }
    }

    /// Remove a client from every known topic (on disconnect/session takeover).
    pub fn unsubscribe_all(&self, client_id: &str) {
        for topic in self.topics.iter() {
            topic.value().remove(client_id);
        }
    }

    /// Drop topic entries that no longer have any subscriber. Run
    /// periodically; a topic recreated mid-sweep just gets backfilled again.
    pub fn sweep(&self) {
        let empty: Vec<Arc<str>> = self
            .topics
            .iter()
            .filter(|entry| entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();

        for topic in empty {
            self.topics.remove_if(&topic, |_, v| v.is_empty());
        }
    }

    /// Number of topic entries currently tracked (for diagnostics/tests).
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}
