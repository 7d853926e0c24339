//! In-process broker metrics
//!
//! Plain atomic counters and gauges tracking connection, message, and
//! subscription activity. These feed the `$SYS/broker/...` retained topics;
//! there is no HTTP or Prometheus exposition surface.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// All broker metrics in one place
#[derive(Default)]
pub struct Metrics {
    // Connection metrics
    pub connections_total: AtomicU64,
    pub connections_current: AtomicI64,

    // Message metrics
    pub messages_received_total: AtomicU64,
    pub messages_sent_total: AtomicU64,
    pub messages_bytes_received: AtomicU64,
    pub messages_bytes_sent: AtomicU64,

    // Subscription metrics
    pub subscriptions_current: AtomicI64,
    pub subscriptions_total: AtomicU64,
    pub unsubscriptions_total: AtomicU64,

    // Retained messages
    pub retained_messages_current: AtomicI64,
    pub retained_bytes_current: AtomicI64,

    // QoS metrics
    pub qos1_retransmits: AtomicU64,
    pub qos2_retransmits: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    // Helper methods for common operations

    pub fn client_connected(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_current.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_disconnected(&self) {
        self.connections_current.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn message_received(&self, bytes: usize) {
        self.messages_received_total.fetch_add(1, Ordering::Relaxed);
        self.messages_bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn message_sent(&self, bytes: usize) {
        self.messages_sent_total.fetch_add(1, Ordering::Relaxed);
        self.messages_bytes_sent
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn subscription_added(&self) {
        self.subscriptions_current.fetch_add(1, Ordering::Relaxed);
        self.subscriptions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscription_removed(&self) {
        self.subscriptions_current.fetch_sub(1, Ordering::Relaxed);
        self.unsubscriptions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retained_message_stored(&self, bytes: usize) {
        self.retained_messages_current
            .fetch_add(1, Ordering::Relaxed);
        self.retained_bytes_current
            .fetch_add(bytes as i64, Ordering::Relaxed);
    }

    pub fn retained_message_removed(&self, bytes: usize) {
        self.retained_messages_current
            .fetch_sub(1, Ordering::Relaxed);
        self.retained_bytes_current
            .fetch_sub(bytes as i64, Ordering::Relaxed);
    }

    pub fn qos1_retransmit(&self) {
        self.qos1_retransmits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn qos2_retransmit(&self) {
        self.qos2_retransmits.fetch_add(1, Ordering::Relaxed);
    }
}
