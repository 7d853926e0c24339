//! HearthMQ - MQTT v3.1.1/v5.0 broker core
//!
//! Implements the wire codec, topic trie, per-connection session state
//! machine, and router that make up the heart of an MQTT broker.

pub mod auth;
pub mod broker;
pub mod buffer_pool;
pub mod codec;
pub mod config;
pub mod hooks;
pub mod metrics;
pub mod protocol;
pub mod session;
pub mod topic;
pub mod transport;

pub use auth::AuthProvider;
pub use broker::Broker;
pub use config::Config;
pub use hooks::{CompositeHooks, DefaultHooks, Hooks};
pub use metrics::Metrics;
pub use protocol::{ProtocolVersion, QoS};
