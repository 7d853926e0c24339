//! QoS acknowledgment handling (PUBACK, PUBREC, PUBREL, PUBCOMP)

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::{Connection, ConnectionError};
use crate::protocol::{
    Packet, Properties, ProtocolError, ProtocolVersion, PubAck, PubComp, PubRec, PubRel, Publish,
    ReasonCode,
};
use crate::session::{Qos2State, Session};

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Handle PUBACK packet
    pub(crate) async fn handle_puback(
        &mut self,
        session: &Arc<RwLock<Session>>,
        puback: PubAck,
    ) -> Result<(), ConnectionError> {
        session.write().inflight_outgoing.remove(&puback.packet_id);
        Ok(())
    }

    /// Handle PUBREC packet
    pub(crate) async fn handle_pubrec(
        &mut self,
        session: &Arc<RwLock<Session>>,
        pubrec: PubRec,
    ) -> Result<(), ConnectionError> {
        {
            let mut s = session.write();
            if let Some(inflight) = s.inflight_outgoing.get_mut(&pubrec.packet_id) {
                inflight.qos2_state = Some(Qos2State::WaitingPubComp);
            }
        }

        let pubrel = PubRel::new(pubrec.packet_id);
        self.write_buf.clear();
        self.encoder
            .encode(&Packet::PubRel(pubrel), &mut self.write_buf)
            .map_err(|e| ConnectionError::Protocol(e.into()))?;
        self.stream.write_all(&self.write_buf).await?;

        Ok(())
    }

    /// Handle PUBREL packet.
    ///
    /// The QoS 2 contract requires the message reach subscribers exactly
    /// once that handshake completes, so routing must happen before the
    /// PUBCOMP that tells the publisher the handshake is done.
    ///
    /// A PUBREL whose packet identifier isn't in `inflight_incoming` means
    /// either a retried PUBREL for an already-completed exchange, or a
    /// protocol violation; either way the message must not be routed again.
    pub(crate) async fn handle_pubrel(
        &mut self,
        client_id: &Arc<str>,
        session: &Arc<RwLock<Session>>,
        pubrel: PubRel,
    ) -> Result<(), ConnectionError> {
        let publish = {
            let mut s = session.write();
            s.inflight_incoming.remove(&pubrel.packet_id)
        };

        let pubcomp = match publish {
            Some(publish) => {
                self.route_message(client_id, &publish, None).await?;
                self.hooks
                    .on_message_published(&publish.topic, &publish.payload, publish.qos)
                    .await;
                PubComp::new(pubrel.packet_id)
            }
            None if self.decoder.protocol_version() == Some(ProtocolVersion::V5) => PubComp {
                packet_id: pubrel.packet_id,
                reason_code: ReasonCode::PacketIdNotFound,
                properties: Properties::default(),
            },
            None => {
                return Err(ConnectionError::Protocol(ProtocolError::ProtocolViolation(
                    "PUBREL for unknown packet identifier",
                )));
            }
        };

        self.write_buf.clear();
        self.encoder
            .encode(&Packet::PubComp(pubcomp), &mut self.write_buf)
            .map_err(|e| ConnectionError::Protocol(e.into()))?;
        self.stream.write_all(&self.write_buf).await?;

        Ok(())
    }

    /// Handle PUBCOMP packet
    pub(crate) async fn handle_pubcomp(
        &mut self,
        session: &Arc<RwLock<Session>>,
        pubcomp: PubComp,
    ) -> Result<(), ConnectionError> {
        session.write().inflight_outgoing.remove(&pubcomp.packet_id);
        Ok(())
    }

    /// Retry unacked QoS 1/2 messages
    pub(crate) async fn retry_unacked_messages(
        &mut self,
        session: &Arc<RwLock<Session>>,
    ) -> Result<(), ConnectionError> {
        let now = Instant::now();
        let retry_interval = self.config.retry_interval;

        enum RetryInfo {
            Publish { packet_id: u16, publish: Publish },
            PubRel { packet_id: u16 },
        }

        let to_retry: Vec<_> = {
            let mut s = session.write();
            s.inflight_outgoing
                .iter_mut()
                .filter_map(|(packet_id, inflight)| {
                    if now.duration_since(inflight.sent_at) < retry_interval {
                        return None;
                    }
                    inflight.retry_count += 1;
                    inflight.sent_at = now;

                    match inflight.qos2_state {
                        Some(Qos2State::WaitingPubComp) => {
                            Some(RetryInfo::PubRel { packet_id: *packet_id })
                        }
                        _ => Some(RetryInfo::Publish {
                            packet_id: *packet_id,
                            publish: inflight.publish.clone(),
                        }),
                    }
                })
                .collect()
        };

        let max_packet_size = session.read().max_packet_size;

        for info in to_retry {
            match info {
                RetryInfo::Publish { packet_id, mut publish } => {
                    publish.dup = true;
                    publish.packet_id = Some(packet_id);
                    let qos = publish.qos;

                    self.write_buf.clear();
                    self.encoder
                        .encode(&Packet::Publish(publish), &mut self.write_buf)
                        .map_err(|e| ConnectionError::Protocol(e.into()))?;

                    if self.write_buf.len() <= max_packet_size as usize {
                        trace!("Retrying PUBLISH packet_id={}", packet_id);
                        self.stream.write_all(&self.write_buf).await?;
                        if let Some(ref metrics) = self.metrics {
                            match qos {
                                crate::protocol::QoS::AtLeastOnce => metrics.qos1_retransmit(),
                                crate::protocol::QoS::ExactlyOnce => metrics.qos2_retransmit(),
                                crate::protocol::QoS::AtMostOnce => {}
                            }
                        }
                    }
                }
                RetryInfo::PubRel { packet_id } => {
                    let pubrel = PubRel::new(packet_id);
                    self.write_buf.clear();
                    self.encoder
                        .encode(&Packet::PubRel(pubrel), &mut self.write_buf)
                        .map_err(|e| ConnectionError::Protocol(e.into()))?;

                    trace!("Retrying PUBREL packet_id={}", packet_id);
                    self.stream.write_all(&self.write_buf).await?;
                    if let Some(ref metrics) = self.metrics {
                        metrics.qos2_retransmit();
                    }
                }
            }
        }

        Ok(())
    }
}
