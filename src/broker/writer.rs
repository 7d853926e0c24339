//! Direct write buffer for bypassing channel overhead.
//!
//! SharedWriter lets the router write directly into a per-connection buffer
//! instead of going through an mpsc channel for every fan-out message. The
//! connection's read loop wakes on `notified()` and flushes whatever has
//! accumulated to the socket in one write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use crate::codec::Encoder;
use crate::protocol::{Packet, ProtocolVersion, Publish, QoS};
use crate::session::{InflightMessage, Qos2State, Session};

/// Error when sending to a SharedWriter
#[derive(Debug)]
pub enum SendError {
    /// Connection is closed
    Closed,
    /// Inflight limit reached
    InflightLimitExceeded,
    /// Encoding error
    EncodingError,
}

/// Shared write buffer for direct writes from the router to a connection.
pub struct SharedWriter {
    /// Encoded bytes waiting to be flushed to the socket
    buffer: Mutex<BytesMut>,
    /// Session for packet_id assignment and inflight tracking
    session: Arc<RwLock<Session>>,
    /// Notification when buffer transitions from empty to non-empty
    notify: Notify,
    /// Protocol version for encoding
    protocol_version: ProtocolVersion,
    encoder: Mutex<Encoder>,
    alive: AtomicBool,
    max_packet_size: u32,
    max_inflight: u16,
}

impl SharedWriter {
    pub fn new(
        session: Arc<RwLock<Session>>,
        protocol_version: ProtocolVersion,
        max_packet_size: u32,
        max_inflight: u16,
    ) -> Self {
        Self {
            buffer: Mutex::new(BytesMut::with_capacity(2048)),
            session,
            notify: Notify::new(),
            protocol_version,
            encoder: Mutex::new(Encoder::new(protocol_version)),
            alive: AtomicBool::new(true),
            max_packet_size,
            max_inflight,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
        self.notify.notify_one();
    }

    pub fn notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.notify.notified()
    }

    pub fn take_buffer(&self) -> BytesMut {
        self.buffer.lock().split()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn session(&self) -> &Arc<RwLock<Session>> {
        &self.session
    }

    /// Send a packet that doesn't need packet_id assignment (PUBACK, SUBACK, PINGRESP, ...).
    pub fn send_packet(&self, packet: &Packet) -> Result<(), SendError> {
        if !self.is_alive() {
            return Err(SendError::Closed);
        }

        let was_empty = {
            let mut buffer = self.buffer.lock();
            let encoder = self.encoder.lock();
            let start_len = buffer.len();
            if encoder.encode(packet, &mut buffer).is_err() {
                buffer.truncate(start_len);
                return Err(SendError::EncodingError);
            }
            if buffer.len() - start_len > self.max_packet_size as usize {
                buffer.truncate(start_len);
                return Ok(());
            }
            start_len == 0
        };

        if was_empty {
            self.notify.notify_one();
        }
        Ok(())
    }

    /// Send a PUBLISH to this client, assigning a packet_id and tracking it
    /// inflight for QoS > 0.
    pub fn send_publish(
        &self,
        publish: &mut Publish,
        effective_qos: QoS,
        effective_retain: bool,
    ) -> Result<(), SendError> {
        if !self.is_alive() {
            return Err(SendError::Closed);
        }

        publish.qos = effective_qos;
        publish.retain = effective_retain;
        publish.dup = false;

        if effective_qos != QoS::AtMostOnce {
            let mut session = self.session.write();
            if session.inflight_outgoing.len() >= self.max_inflight as usize {
                return Err(SendError::InflightLimitExceeded);
            }
            let packet_id = session.next_packet_id();
            publish.packet_id = Some(packet_id);
            session.inflight_outgoing.insert(
                packet_id,
                InflightMessage {
                    packet_id,
                    publish: publish.clone(),
                    qos2_state: if effective_qos == QoS::ExactlyOnce {
                        Some(Qos2State::WaitingPubRec)
                    } else {
                        None
                    },
                    sent_at: Instant::now(),
                    retry_count: 0,
                },
            );
        } else {
            publish.packet_id = None;
        }

        let was_empty = {
            let mut buffer = self.buffer.lock();
            let encoder = self.encoder.lock();
            let start_len = buffer.len();

            if encoder
                .encode(&Packet::Publish(publish.clone()), &mut buffer)
                .is_err()
            {
                buffer.truncate(start_len);
                if let Some(pid) = publish.packet_id {
                    drop(encoder);
                    drop(buffer);
                    self.session.write().inflight_outgoing.remove(&pid);
                }
                return Err(SendError::EncodingError);
            }

            if buffer.len() - start_len > self.max_packet_size as usize {
                buffer.truncate(start_len);
                if let Some(pid) = publish.packet_id {
                    drop(encoder);
                    drop(buffer);
                    self.session.write().inflight_outgoing.remove(&pid);
                }
                return Ok(());
            }
            start_len == 0
        };

        if was_empty {
            self.notify.notify_one();
        }
        Ok(())
    }
}

impl std::fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedWriter")
            .field("buffer_len", &self.buffer_len())
            .field("alive", &self.is_alive())
            .field("protocol_version", &self.protocol_version)
            .finish()
    }
}
