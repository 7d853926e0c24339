//! Topic matching and subscription bookkeeping
//!
//! `validation` implements topic name/filter validation and the filter-match
//! predicate. `trie` is the generic per-session filter index: each `Session`
//! owns one `TopicTrie<Subscription>` keyed by the filters it has
//! subscribed to. The broker-wide fan-out index lives in `broker::router`
//! and is deliberately NOT a trie — see its module docs.

mod trie;
pub mod validation;

pub use trie::TopicTrie;
pub use validation::{
    topic_matches_filter, validate_topic_filter, validate_topic_filter_with_max_levels,
    validate_topic_name, validate_topic_name_with_max_levels, TopicLevel,
};

use std::sync::Arc;

use crate::protocol::QoS;

/// A single subscription, as recorded in a session's own filter trie.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Client ID that owns this subscription
    pub client_id: Arc<str>,
    /// Subscription QoS (the maximum the client wants to receive)
    pub qos: QoS,
    /// No local flag (v5.0) - don't send messages to the client that published them
    pub no_local: bool,
    /// Retain as published flag (v5.0)
    pub retain_as_published: bool,
    /// Subscription identifier (v5.0)
    pub subscription_id: Option<u32>,
}
