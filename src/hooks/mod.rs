//! Extensibility points for auth, ACL checks, and connection/publish
//! lifecycle events.
//!
//! The broker itself only depends on the [`Hooks`] trait; everything
//! concrete (the static-user-table [`crate::auth::AuthProvider`], metrics
//! counters, custom ACL logic) plugs in by implementing it and wiring the
//! implementation in through [`CompositeHooks`] or a bare `Arc<dyn Hooks>`.

use std::fmt;

use async_trait::async_trait;

use crate::protocol::QoS;

#[cfg(test)]
mod tests;

/// Failure from a hook callback, distinct from an outright `Ok(false)`
/// deny — this is for the hook itself breaking, not the decision it made.
#[derive(Debug)]
pub enum HookError {
    Internal(String),
    AuthenticationFailed,
    AuthorizationDenied,
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::Internal(msg) => write!(f, "hook internal error: {}", msg),
            HookError::AuthenticationFailed => f.write_str("authentication failed"),
            HookError::AuthorizationDenied => f.write_str("authorization denied"),
        }
    }
}

impl std::error::Error for HookError {}

pub type HookResult<T> = Result<T, HookError>;

/// Callbacks the connection handler invokes at the points where broker
/// behavior is meant to be customizable. Every method defaults to
/// permissive/no-op so a type only needs to override what it cares about.
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Decides whether a CONNECT with these credentials may proceed.
    /// `username`/`password` are `None` when the client connected
    /// anonymously.
    async fn on_authenticate(
        &self,
        _client_id: &str,
        _username: Option<&str>,
        _password: Option<&[u8]>,
    ) -> HookResult<bool> {
        Ok(true)
    }

    /// Decides whether a PUBLISH to `topic` at the given QoS/retain may
    /// proceed, before the message is routed to any subscriber.
    async fn on_publish_check(
        &self,
        _client_id: &str,
        _username: Option<&str>,
        _topic: &str,
        _qos: QoS,
        _retain: bool,
    ) -> HookResult<bool> {
        Ok(true)
    }

    /// Decides whether a SUBSCRIBE filter may be added, before it's
    /// inserted into the subscriber trie.
    async fn on_subscribe_check(
        &self,
        _client_id: &str,
        _username: Option<&str>,
        _filter: &str,
        _qos: QoS,
    ) -> HookResult<bool> {
        Ok(true)
    }

    /// Fires once a CONNACK with a success code has actually been written.
    async fn on_client_connected(&self, _client_id: &str, _username: Option<&str>) {}

    /// Fires when a client's connection ends, `graceful` distinguishing a
    /// received DISCONNECT from a dropped socket or protocol error.
    async fn on_client_disconnected(&self, _client_id: &str, _graceful: bool) {}

    /// Fires after a message has been handed to the router, once per
    /// publish regardless of how many (if any) subscribers received it.
    async fn on_message_published(&self, _topic: &str, _payload: &[u8], _qos: QoS) {}
}

/// A [`Hooks`] implementation with every callback at its permissive
/// default; what the broker uses when no hooks are configured.
#[derive(Default)]
pub struct DefaultHooks;

#[async_trait]
impl Hooks for DefaultHooks {}

/// Forwards every callback through the pointee, so an `Arc<dyn Hooks>` (or
/// any other `Arc<T: Hooks>`) can be passed wherever a `&dyn Hooks` is
/// expected without an extra layer of indirection at the call site.
#[async_trait]
impl<T: Hooks + ?Sized> Hooks for std::sync::Arc<T> {
    async fn on_authenticate(
        &self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&[u8]>,
    ) -> HookResult<bool> {
        self.as_ref().on_authenticate(client_id, username, password).await
    }

    async fn on_publish_check(
        &self,
        client_id: &str,
        username: Option<&str>,
        topic: &str,
        qos: QoS,
        retain: bool,
    ) -> HookResult<bool> {
        self.as_ref()
            .on_publish_check(client_id, username, topic, qos, retain)
            .await
    }

    async fn on_subscribe_check(
        &self,
        client_id: &str,
        username: Option<&str>,
        filter: &str,
        qos: QoS,
    ) -> HookResult<bool> {
        self.as_ref()
            .on_subscribe_check(client_id, username, filter, qos)
            .await
    }

    async fn on_client_connected(&self, client_id: &str, username: Option<&str>) {
        self.as_ref().on_client_connected(client_id, username).await;
    }

    async fn on_client_disconnected(&self, client_id: &str, graceful: bool) {
        self.as_ref().on_client_disconnected(client_id, graceful).await;
    }

    async fn on_message_published(&self, topic: &str, payload: &[u8], qos: QoS) {
        self.as_ref().on_message_published(topic, payload, qos).await;
    }
}

/// Chains an ordered list of [`Hooks`] implementations.
///
/// Authenticate/publish/subscribe checks are ANDed: the first `Ok(false)`
/// or `Err` short-circuits the rest. Event callbacks (`on_client_connected`
/// and friends) have no veto concept, so every hook in the chain always
/// runs, in registration order.
#[derive(Default)]
pub struct CompositeHooks {
    chain: Vec<Box<dyn Hooks>>,
}

impl CompositeHooks {
    pub fn new() -> Self {
        Self { chain: Vec::new() }
    }

    pub fn add<H: Hooks + 'static>(&mut self, hooks: H) {
        self.chain.push(Box::new(hooks));
    }

    /// Builder-style variant of [`Self::add`].
    pub fn with<H: Hooks + 'static>(mut self, hooks: H) -> Self {
        self.add(hooks);
        self
    }
}

/// Runs an async per-hook check over the chain, short-circuiting on the
/// first denial or error. Shared by the three checked callbacks below so
/// the AND-chain logic lives in exactly one place.
macro_rules! all_allow {
    ($chain:expr, |$hook:ident| $call:expr) => {{
        for $hook in $chain {
            if !$call.await? {
                return Ok(false);
            }
        }
        Ok(true)
    }};
}

#[async_trait]
impl Hooks for CompositeHooks {
    async fn on_authenticate(
        &self,
        client_id: &str,
        username: Option<&str>,
        password: Option<&[u8]>,
    ) -> HookResult<bool> {
        all_allow!(&self.chain, |h| h.on_authenticate(client_id, username, password))
    }

    async fn on_publish_check(
        &self,
        client_id: &str,
        username: Option<&str>,
        topic: &str,
        qos: QoS,
        retain: bool,
    ) -> HookResult<bool> {
        all_allow!(&self.chain, |h| h
            .on_publish_check(client_id, username, topic, qos, retain))
    }

    async fn on_subscribe_check(
        &self,
        client_id: &str,
        username: Option<&str>,
        filter: &str,
        qos: QoS,
    ) -> HookResult<bool> {
        all_allow!(&self.chain, |h| h
            .on_subscribe_check(client_id, username, filter, qos))
    }

    async fn on_client_connected(&self, client_id: &str, username: Option<&str>) {
        for hook in &self.chain {
            hook.on_client_connected(client_id, username).await;
        }
    }

    async fn on_client_disconnected(&self, client_id: &str, graceful: bool) {
        for hook in &self.chain {
            hook.on_client_disconnected(client_id, graceful).await;
        }
    }

    async fn on_message_published(&self, topic: &str, payload: &[u8], qos: QoS) {
        for hook in &self.chain {
            hook.on_message_published(topic, payload, qos).await;
        }
    }
}
