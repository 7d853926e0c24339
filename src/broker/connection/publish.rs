//! PUBLISH packet handling and message routing

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, trace, warn};

// Thread-local dedup map for route_message to avoid per-publish allocation.
// Key: client_id, Value: aggregated subscription info
// Capacity 256 reduces reallocations for moderate fan-outs
thread_local! {
    static DEDUP_MAP: RefCell<AHashMap<Arc<str>, ClientSub>> =
        RefCell::new(AHashMap::with_capacity(256));
}

/// Aggregated subscription info for a single client during message routing
struct ClientSub {
    qos: QoS,
    retain_as_published: bool,
    subscription_ids: SmallVec<[u32; 4]>,
}

use super::{Connection, ConnectionError};
use crate::broker::{BrokerEvent, RetainedMessage};
use crate::protocol::{Packet, Properties, PubAck, PubRec, Publish, QoS, ReasonCode};
use crate::session::Session;
use crate::topic::validate_topic_name_with_max_levels;

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Handle PUBLISH packet
    pub(crate) async fn handle_publish(
        &mut self,
        client_id: &Arc<str>,
        session: &Arc<RwLock<Session>>,
        publish: Publish,
    ) -> Result<(), ConnectionError> {
        // Validate topic name
        if let Err(e) =
            validate_topic_name_with_max_levels(&publish.topic, self.config.max_topic_levels)
        {
            warn!("Invalid topic name from {}: {}", client_id, e);
            if publish.qos != QoS::AtMostOnce {
                let packet_id = publish.packet_id.unwrap();
                let response = if publish.qos == QoS::AtLeastOnce {
                    Packet::PubAck(PubAck {
                        packet_id,
                        reason_code: ReasonCode::TopicNameInvalid,
                        properties: Properties::default(),
                    })
                } else {
                    Packet::PubRec(PubRec {
                        packet_id,
                        reason_code: ReasonCode::TopicNameInvalid,
                        properties: Properties::default(),
                    })
                };
                self.write_buf.clear();
                self.encoder
                    .encode(&response, &mut self.write_buf)
                    .map_err(|e| ConnectionError::Protocol(e.into()))?;
                self.stream.write_all(&self.write_buf).await?;
            }
            return Ok(());
        }

        trace!(
            "PUBLISH from {} to {} (QoS {:?})",
            client_id,
            publish.topic,
            publish.qos
        );

        if let Some(ref metrics) = self.metrics {
            metrics.message_received(publish.payload.len());
        }

        // Check ACL for publish permission
        let acl_result = self
            .hooks
            .on_publish_check(
                client_id,
                self.username.as_deref(),
                &publish.topic,
                publish.qos,
                publish.retain,
            )
            .await;

        match acl_result {
            Ok(true) => {
                // Publish allowed
            }
            Ok(false) => {
                debug!(
                    "PUBLISH denied for {} to topic {} (ACL)",
                    client_id, publish.topic
                );
                if publish.qos != QoS::AtMostOnce {
                    let packet_id = publish.packet_id.unwrap();
                    let response = if publish.qos == QoS::AtLeastOnce {
                        Packet::PubAck(PubAck {
                            packet_id,
                            reason_code: ReasonCode::NotAuthorized,
                            properties: Properties::default(),
                        })
                    } else {
                        Packet::PubRec(PubRec {
                            packet_id,
                            reason_code: ReasonCode::NotAuthorized,
                            properties: Properties::default(),
                        })
                    };
                    self.write_buf.clear();
                    self.encoder
                        .encode(&response, &mut self.write_buf)
                        .map_err(|e| ConnectionError::Protocol(e.into()))?;
                    self.stream.write_all(&self.write_buf).await?;
                }
                return Ok(());
            }
            Err(e) => {
                error!("ACL check error for {}: {}", client_id, e);
                if publish.qos != QoS::AtMostOnce {
                    let packet_id = publish.packet_id.unwrap();
                    let response = if publish.qos == QoS::AtLeastOnce {
                        Packet::PubAck(PubAck {
                            packet_id,
                            reason_code: ReasonCode::UnspecifiedError,
                            properties: Properties::default(),
                        })
                    } else {
                        Packet::PubRec(PubRec {
                            packet_id,
                            reason_code: ReasonCode::UnspecifiedError,
                            properties: Properties::default(),
                        })
                    };
                    self.write_buf.clear();
                    self.encoder
                        .encode(&response, &mut self.write_buf)
                        .map_err(|e| ConnectionError::Protocol(e.into()))?;
                    self.stream.write_all(&self.write_buf).await?;
                }
                return Ok(());
            }
        }

        // Handle QoS
        match publish.qos {
            QoS::AtMostOnce => {
                // No acknowledgment needed
            }
            QoS::AtLeastOnce => {
                let puback = PubAck::new(publish.packet_id.unwrap());
                self.write_buf.clear();
                self.encoder
                    .encode(&Packet::PubAck(puback), &mut self.write_buf)
                    .map_err(|e| ConnectionError::Protocol(e.into()))?;
                self.stream.write_all(&self.write_buf).await?;
            }
            QoS::ExactlyOnce => {
                // Store message and send PUBREC - routing happens on PUBREL, not here,
                // so the sender sees exactly-once delivery even if PUBREL is retried.
                let packet_id = publish.packet_id.unwrap();

                let limit_exceeded = {
                    let s = session.read();
                    s.inflight_incoming.len() >= self.config.max_inflight as usize
                };

                if limit_exceeded {
                    debug!("Max awaiting PUBREL limit reached, rejecting QoS 2 publish");
                    let pubrec = PubRec {
                        packet_id,
                        reason_code: ReasonCode::QuotaExceeded,
                        properties: Properties::default(),
                    };
                    self.write_buf.clear();
                    self.encoder
                        .encode(&Packet::PubRec(pubrec), &mut self.write_buf)
                        .map_err(|e| ConnectionError::Protocol(e.into()))?;
                    self.stream.write_all(&self.write_buf).await?;
                    return Ok(());
                }

                self.store_retained(&publish);

                {
                    let mut s = session.write();
                    s.inflight_incoming.insert(packet_id, publish.clone());
                }

                let pubrec = PubRec::new(packet_id);
                self.write_buf.clear();
                self.encoder
                    .encode(&Packet::PubRec(pubrec), &mut self.write_buf)
                    .map_err(|e| ConnectionError::Protocol(e.into()))?;
                self.stream.write_all(&self.write_buf).await?;

                return Ok(());
            }
        }

        self.store_retained(&publish);
        self.route_message(client_id, &publish, None).await?;
        self.hooks
            .on_message_published(&publish.topic, &publish.payload, publish.qos)
            .await;

        Ok(())
    }

    fn store_retained(&self, publish: &Publish) {
        if !publish.retain || !self.config.retain_available {
            return;
        }
        let topic_str = publish.topic.to_string();
        if publish.payload.is_empty() {
            if let Some((_, old)) = self.retained.remove(&topic_str) {
                if let Some(ref metrics) = self.metrics {
                    metrics.retained_message_removed(old.payload.len());
                }
            }
        } else {
            let payload_len = publish.payload.len();
            let old = self.retained.insert(
                topic_str,
                RetainedMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.clone(),
                    qos: publish.qos,
                    properties: publish.properties.clone(),
                    timestamp: Instant::now(),
                },
            );
            if let Some(ref metrics) = self.metrics {
                if let Some(old) = old {
                    metrics.retained_message_removed(old.payload.len());
                }
                metrics.retained_message_stored(payload_len);
            }
        }
    }

    /// Route a message to subscribers.
    ///
    /// Deduplicates by client_id with a reused thread-local map, keeping the
    /// highest granted QoS and collecting every matching subscription id, so a
    /// client subscribed to a topic through more than one filter gets exactly
    /// one delivery.
    pub(crate) async fn route_message(
        &self,
        sender_id: &Arc<str>,
        publish: &Publish,
        subscription_id_override: Option<u32>,
    ) -> Result<(), ConnectionError> {
        let matches = self.router.subscribers_for(&publish.topic).subscribers();

        DEDUP_MAP.with(|map_cell| {
            let mut client_subs = map_cell.borrow_mut();
            client_subs.clear(); // Reuse allocation from previous calls

            for sub in &matches {
                // Skip sender if no_local is set
                if sub.no_local && sub.client_id == *sender_id {
                    continue;
                }

                let sub_id = subscription_id_override.or(sub.subscription_id);

                if let Some(entry) = client_subs.get_mut(&sub.client_id) {
                    if sub.qos > entry.qos {
                        entry.qos = sub.qos;
                    }
                    if sub.retain_as_published {
                        entry.retain_as_published = true;
                    }
                    if let Some(id) = sub_id {
                        if !entry.subscription_ids.contains(&id) {
                            entry.subscription_ids.push(id);
                        }
                    }
                } else {
                    let mut subscription_ids = SmallVec::new();
                    if let Some(id) = sub_id {
                        subscription_ids.push(id);
                    }
                    client_subs.insert(
                        sub.client_id.clone(),
                        ClientSub {
                            qos: sub.qos,
                            retain_as_published: sub.retain_as_published,
                            subscription_ids,
                        },
                    );
                }
            }

            for (client_id, sub_info) in client_subs.drain() {
                let effective_qos = publish.qos.min(sub_info.qos);
                let effective_retain = if sub_info.retain_as_published {
                    publish.retain
                } else {
                    false
                };

                if let Some(writer) = self.connections.get(&client_id) {
                    let mut outgoing = publish.clone();
                    for id in &sub_info.subscription_ids {
                        outgoing.properties.subscription_identifiers.push(*id);
                    }

                    if let Err(e) = writer.send_publish(&mut outgoing, effective_qos, effective_retain) {
                        trace!(client_id = %client_id, error = ?e, "send_publish failed");
                    }
                } else if let Some(session) = self.sessions.get(client_id.as_ref()) {
                    // Client disconnected, queue for delivery if the session persists.
                    let mut s = session.write();
                    if !s.clean_start {
                        let mut outgoing = publish.clone();
                        outgoing.qos = effective_qos;
                        outgoing.dup = false;
                        outgoing.packet_id = None;
                        outgoing.retain = effective_retain;

                        for id in &sub_info.subscription_ids {
                            outgoing.properties.subscription_identifiers.push(*id);
                        }

                        s.queue_message(outgoing);
                    }
                }
            }
        });

        let _ = self.events.send(BrokerEvent::MessagePublished {
            topic: publish.topic.to_string(),
            payload: publish.payload.clone(),
            qos: publish.qos,
            retain: publish.retain,
        });

        Ok(())
    }
}
