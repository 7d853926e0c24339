//! Turns a byte buffer into [`Packet`] values.
//!
//! [`Decoder::decode`] is written against a byte slice that may hold less
//! than one full packet — it returns `Ok(None)` rather than an error when
//! the fixed header or remaining-length bytes aren't all there yet, so
//! callers can feed it directly from a growing read buffer without
//! pre-framing anything.

use std::sync::Arc;

use bytes::Bytes;

use super::{read_binary, read_string, read_u16, read_variable_int, MAX_REMAINING_LENGTH};
use crate::protocol::{
    Auth, ConnAck, Connect, DecodeError, Disconnect, Packet, Properties, ProtocolVersion, PubAck,
    PubComp, PubRec, PubRel, Publish, QoS, ReasonCode, SubAck, Subscribe, Subscription,
    SubscriptionOptions, UnsubAck, Unsubscribe, Will,
};

/// Decodes a v5 properties block trailing after `offset` bytes of a
/// packet's variable header, or an empty block if the packet ended
/// exactly at `offset` (properties are the last thing before the payload
/// on every packet type that carries them, so "nothing left" means "no
/// properties" rather than a truncated packet).
fn trailing_properties(payload: &[u8], offset: usize) -> Result<Properties, DecodeError> {
    if payload.len() > offset {
        Ok(Properties::decode(&payload[offset..])?.0)
    } else {
        Ok(Properties::default())
    }
}

/// Reads an MQTT-5 reason code followed by an optional properties block,
/// the shape shared by CONNACK/PUBACK/PUBREC/PUBREL/PUBCOMP/DISCONNECT/AUTH
/// once their packet-identifier (if any) has already been consumed.
fn reason_and_properties(payload: &[u8]) -> Result<(ReasonCode, Properties), DecodeError> {
    let reason_code =
        ReasonCode::from_u8(payload[0]).ok_or(DecodeError::InvalidReasonCode(payload[0]))?;
    let properties = trailing_properties(payload, 1)?;
    Ok((reason_code, properties))
}

/// Turns MQTT control packet bytes into [`Packet`] values. Stateful only
/// in that a few packet types decode differently depending on which
/// protocol version the connection negotiated during CONNECT.
pub struct Decoder {
    packet_size_limit: usize,
    negotiated_version: Option<ProtocolVersion>,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            packet_size_limit: MAX_REMAINING_LENGTH,
            negotiated_version: None,
        }
    }

    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.packet_size_limit = size.min(MAX_REMAINING_LENGTH);
        self
    }

    pub fn set_protocol_version(&mut self, version: ProtocolVersion) {
        self.negotiated_version = Some(version);
    }

    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.negotiated_version
    }

    fn is_v5(&self) -> bool {
        self.negotiated_version == Some(ProtocolVersion::V5)
    }

    /// Decodes one packet from the front of `buf`. Returns `Ok(None)` when
    /// `buf` doesn't yet hold a complete packet rather than erroring —
    /// callers should wait for more bytes and retry.
    pub fn decode(&mut self, buf: &[u8]) -> Result<Option<(Packet, usize)>, DecodeError> {
        if buf.len() < 2 {
            return Ok(None);
        }

        let first_byte = buf[0];
        let packet_type = first_byte >> 4;
        let flags = first_byte & 0x0F;

        let (remaining_length, len_bytes) = match read_variable_int(&buf[1..]) {
            Ok(r) => r,
            Err(DecodeError::InsufficientData) => return Ok(None),
            Err(e) => return Err(e),
        };

        if remaining_length as usize > self.packet_size_limit {
            return Err(DecodeError::PacketTooLarge);
        }

        let total_len = 1 + len_bytes + remaining_length as usize;
        if buf.len() < total_len {
            return Ok(None);
        }

        let payload = &buf[1 + len_bytes..total_len];

        let packet = match packet_type {
            1 => self.decode_connect(payload)?,
            2 => self.decode_connack(flags, payload)?,
            3 => self.decode_publish(flags, payload)?,
            4 => self.decode_puback(flags, payload)?,
            5 => self.decode_pubrec(flags, payload)?,
            6 => self.decode_pubrel(flags, payload)?,
            7 => self.decode_pubcomp(flags, payload)?,
            8 => self.decode_subscribe(flags, payload)?,
            9 => self.decode_suback(flags, payload)?,
            10 => self.decode_unsubscribe(flags, payload)?,
            11 => self.decode_unsuback(flags, payload)?,
            12 if flags == 0 => Packet::PingReq,
            13 if flags == 0 => Packet::PingResp,
            12 | 13 => return Err(DecodeError::InvalidFlags),
            14 => self.decode_disconnect(flags, payload)?,
            15 => self.decode_auth(flags, payload)?,
            _ => return Err(DecodeError::InvalidPacketType(packet_type)),
        };

        Ok(Some((packet, total_len)))
    }

    fn decode_connect(&mut self, payload: &[u8]) -> Result<Packet, DecodeError> {
        let mut pos = 0;

        let (protocol_name, len) = read_string(&payload[pos..])?;
        pos += len;
        if protocol_name != "MQTT" && protocol_name != "MQIsdp" {
            return Err(DecodeError::InvalidProtocolName);
        }

        if pos >= payload.len() {
            return Err(DecodeError::InsufficientData);
        }
        let version_byte = payload[pos];
        pos += 1;
        let protocol_version = match version_byte {
            3 | 4 => ProtocolVersion::V311,
            5 => ProtocolVersion::V5,
            _ => return Err(DecodeError::InvalidProtocolVersion(version_byte)),
        };
        self.negotiated_version = Some(protocol_version);

        if pos >= payload.len() {
            return Err(DecodeError::InsufficientData);
        }
        let connect_flags = payload[pos];
        pos += 1;

        if (connect_flags & 0x01) != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        let clean_start = (connect_flags & 0x02) != 0;
        let will_flag = (connect_flags & 0x04) != 0;
        let will_qos = (connect_flags >> 3) & 0x03;
        let will_retain = (connect_flags & 0x20) != 0;
        let password_flag = (connect_flags & 0x40) != 0;
        let username_flag = (connect_flags & 0x80) != 0;

        // [MQTT-3.1.2-22]
        if !username_flag && password_flag {
            return Err(DecodeError::InvalidFlags);
        }
        if will_qos > 2 {
            return Err(DecodeError::InvalidQoS(will_qos));
        }
        if !will_flag && (will_qos != 0 || will_retain) {
            return Err(DecodeError::InvalidFlags);
        }

        if pos + 2 > payload.len() {
            return Err(DecodeError::InsufficientData);
        }
        let keep_alive = read_u16(&payload[pos..])?;
        pos += 2;

        let properties = if protocol_version == ProtocolVersion::V5 {
            let (props, len) = Properties::decode(&payload[pos..])?;
            pos += len;
            props
        } else {
            Properties::default()
        };

        let (client_id, len) = read_string(&payload[pos..])?;
        pos += len;

        let will = if will_flag {
            let will_properties = if protocol_version == ProtocolVersion::V5 {
                let (props, len) = Properties::decode(&payload[pos..])?;
                pos += len;
                props
            } else {
                Properties::default()
            };

            let (will_topic, len) = read_string(&payload[pos..])?;
            pos += len;
            let (will_payload, len) = read_binary(&payload[pos..])?;
            pos += len;

            Some(Will {
                topic: will_topic.to_string(),
                payload: Bytes::copy_from_slice(will_payload),
                qos: QoS::from_u8(will_qos).unwrap(),
                retain: will_retain,
                properties: will_properties,
            })
        } else {
            None
        };

        let username = if username_flag {
            let (s, len) = read_string(&payload[pos..])?;
            pos += len;
            Some(s.to_string())
        } else {
            None
        };

        let password = if password_flag {
            let (data, _) = read_binary(&payload[pos..])?;
            Some(Bytes::copy_from_slice(data))
        } else {
            None
        };

        Ok(Packet::Connect(Box::new(Connect {
            protocol_version,
            client_id: client_id.to_string(),
            clean_start,
            keep_alive,
            username,
            password,
            will,
            properties,
        })))
    }

    fn decode_connack(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        if payload.len() < 2 {
            return Err(DecodeError::InsufficientData);
        }

        let acknowledge_flags = payload[0];
        if (acknowledge_flags & 0xFE) != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        let session_present = (acknowledge_flags & 0x01) != 0;

        let (reason_code, properties) = if self.is_v5() || self.negotiated_version.is_none() {
            let reason_code = ReasonCode::from_u8(payload[1])
                .ok_or(DecodeError::InvalidReasonCode(payload[1]))?;
            (reason_code, trailing_properties(payload, 2)?)
        } else {
            (ReasonCode::from_v3_connack_code(payload[1]), Properties::default())
        };

        Ok(Packet::ConnAck(ConnAck {
            session_present,
            reason_code,
            properties,
        }))
    }

    fn decode_publish(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        let dup = (flags & 0x08) != 0;
        let qos_bits = (flags >> 1) & 0x03;
        let retain = (flags & 0x01) != 0;
        let qos = QoS::from_u8(qos_bits).ok_or(DecodeError::InvalidQoS(qos_bits))?;

        if qos == QoS::AtMostOnce && dup {
            return Err(DecodeError::MalformedPacket("DUP must be 0 for QoS 0"));
        }

        let mut pos = 0;
        let (topic, len) = read_string(&payload[pos..])?;
        pos += len;
        if topic.contains('+') || topic.contains('#') {
            return Err(DecodeError::MalformedPacket("topic contains wildcard"));
        }

        let packet_id = if qos != QoS::AtMostOnce {
            if pos + 2 > payload.len() {
                return Err(DecodeError::InsufficientData);
            }
            let id = read_u16(&payload[pos..])?;
            if id == 0 {
                return Err(DecodeError::MalformedPacket("packet id cannot be 0"));
            }
            pos += 2;
            Some(id)
        } else {
            None
        };

        let properties = if self.is_v5() {
            let (props, len) = Properties::decode(&payload[pos..])?;
            pos += len;
            props
        } else {
            Properties::default()
        };

        Ok(Packet::Publish(Publish {
            dup,
            qos,
            retain,
            topic: Arc::from(topic),
            packet_id,
            payload: Bytes::copy_from_slice(&payload[pos..]),
            properties,
        }))
    }

    /// Shared body for PUBACK/PUBREC/PUBREL/PUBCOMP: packet id, then (v5
    /// only, and only if present) a reason code and properties.
    fn decode_qos_ack(&self, payload: &[u8]) -> Result<(u16, ReasonCode, Properties), DecodeError> {
        if payload.len() < 2 {
            return Err(DecodeError::InsufficientData);
        }
        let packet_id = read_u16(payload)?;

        if !self.is_v5() || payload.len() <= 2 {
            return Ok((packet_id, ReasonCode::Success, Properties::default()));
        }

        let reason_code =
            ReasonCode::from_u8(payload[2]).ok_or(DecodeError::InvalidReasonCode(payload[2]))?;
        let properties = trailing_properties(payload, 3)?;
        Ok((packet_id, reason_code, properties))
    }

    fn decode_puback(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        let (packet_id, reason_code, properties) = self.decode_qos_ack(payload)?;
        Ok(Packet::PubAck(PubAck { packet_id, reason_code, properties }))
    }

    fn decode_pubrec(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        let (packet_id, reason_code, properties) = self.decode_qos_ack(payload)?;
        Ok(Packet::PubRec(PubRec { packet_id, reason_code, properties }))
    }

    fn decode_pubrel(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0x02 {
            return Err(DecodeError::InvalidFlags);
        }
        let (packet_id, reason_code, properties) = self.decode_qos_ack(payload)?;
        Ok(Packet::PubRel(PubRel { packet_id, reason_code, properties }))
    }

    fn decode_pubcomp(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        let (packet_id, reason_code, properties) = self.decode_qos_ack(payload)?;
        Ok(Packet::PubComp(PubComp { packet_id, reason_code, properties }))
    }

    fn decode_subscribe(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0x02 {
            return Err(DecodeError::InvalidFlags);
        }
        if payload.len() < 2 {
            return Err(DecodeError::InsufficientData);
        }

        let packet_id = read_u16(payload)?;
        if packet_id == 0 {
            return Err(DecodeError::MalformedPacket("packet id cannot be 0"));
        }

        let mut pos = 2;
        let properties = if self.is_v5() {
            let (props, len) = Properties::decode(&payload[pos..])?;
            pos += len;
            props
        } else {
            Properties::default()
        };

        let mut subscriptions = Vec::new();
        while pos < payload.len() {
            let (filter, len) = read_string(&payload[pos..])?;
            pos += len;
            // [MQTT-4.7.0-1]
            if filter.is_empty() {
                return Err(DecodeError::MalformedPacket("topic filter cannot be empty"));
            }

            if pos >= payload.len() {
                return Err(DecodeError::InsufficientData);
            }
            let options_byte = payload[pos];
            pos += 1;

            let options = if self.is_v5() {
                SubscriptionOptions::from_byte(options_byte)
                    .ok_or(DecodeError::InvalidSubscriptionOptions)?
            } else {
                let qos = QoS::from_u8(options_byte & 0x03)
                    .ok_or(DecodeError::InvalidQoS(options_byte & 0x03))?;
                SubscriptionOptions { qos, ..Default::default() }
            };

            subscriptions.push(Subscription { filter: filter.to_string(), options });
        }

        if subscriptions.is_empty() {
            return Err(DecodeError::MalformedPacket(
                "SUBSCRIBE must have at least one topic",
            ));
        }

        Ok(Packet::Subscribe(Subscribe { packet_id, subscriptions, properties }))
    }

    fn decode_suback(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        if payload.len() < 3 {
            return Err(DecodeError::InsufficientData);
        }

        let packet_id = read_u16(payload)?;
        let mut pos = 2;

        let properties = if self.is_v5() {
            let (props, len) = Properties::decode(&payload[pos..])?;
            pos += len;
            props
        } else {
            Properties::default()
        };

        let mut reason_codes = Vec::new();
        while pos < payload.len() {
            let code = payload[pos];
            pos += 1;

            let reason_code = if self.is_v5() {
                ReasonCode::from_u8(code).ok_or(DecodeError::InvalidReasonCode(code))?
            } else {
                match code {
                    0x00 => ReasonCode::Success,
                    0x01 => ReasonCode::GrantedQoS1,
                    0x02 => ReasonCode::GrantedQoS2,
                    0x80 => ReasonCode::UnspecifiedError,
                    _ => return Err(DecodeError::InvalidReasonCode(code)),
                }
            };
            reason_codes.push(reason_code);
        }

        Ok(Packet::SubAck(SubAck { packet_id, reason_codes, properties }))
    }

    fn decode_unsubscribe(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0x02 {
            return Err(DecodeError::InvalidFlags);
        }
        if payload.len() < 2 {
            return Err(DecodeError::InsufficientData);
        }

        let packet_id = read_u16(payload)?;
        if packet_id == 0 {
            return Err(DecodeError::MalformedPacket("packet id cannot be 0"));
        }

        let mut pos = 2;
        let properties = if self.is_v5() {
            let (props, len) = Properties::decode(&payload[pos..])?;
            pos += len;
            props
        } else {
            Properties::default()
        };

        let mut filters = Vec::new();
        while pos < payload.len() {
            let (filter, len) = read_string(&payload[pos..])?;
            pos += len;
            // [MQTT-4.7.0-1]
            if filter.is_empty() {
                return Err(DecodeError::MalformedPacket("topic filter cannot be empty"));
            }
            filters.push(filter.to_string());
        }

        if filters.is_empty() {
            return Err(DecodeError::MalformedPacket(
                "UNSUBSCRIBE must have at least one topic",
            ));
        }

        Ok(Packet::Unsubscribe(Unsubscribe { packet_id, filters, properties }))
    }

    fn decode_unsuback(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        if payload.len() < 2 {
            return Err(DecodeError::InsufficientData);
        }

        let packet_id = read_u16(payload)?;

        let (properties, reason_codes) = if self.is_v5() {
            let mut pos = 2;
            let (props, len) = Properties::decode(&payload[pos..])?;
            pos += len;

            let mut codes = Vec::new();
            while pos < payload.len() {
                codes.push(
                    ReasonCode::from_u8(payload[pos])
                        .ok_or(DecodeError::InvalidReasonCode(payload[pos]))?,
                );
                pos += 1;
            }
            (props, codes)
        } else {
            (Properties::default(), Vec::new())
        };

        Ok(Packet::UnsubAck(UnsubAck { packet_id, reason_codes, properties }))
    }

    fn decode_disconnect(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0 {
            return Err(DecodeError::InvalidFlags);
        }

        if !self.is_v5() {
            if !payload.is_empty() {
                return Err(DecodeError::MalformedPacket("v3.1.1 DISCONNECT has no payload"));
            }
            return Ok(Packet::Disconnect(Disconnect::default()));
        }

        if payload.is_empty() {
            return Ok(Packet::Disconnect(Disconnect::default()));
        }
        let (reason_code, properties) = reason_and_properties(payload)?;
        Ok(Packet::Disconnect(Disconnect { reason_code, properties }))
    }

    fn decode_auth(&self, flags: u8, payload: &[u8]) -> Result<Packet, DecodeError> {
        if flags != 0 {
            return Err(DecodeError::InvalidFlags);
        }
        if !self.is_v5() {
            return Err(DecodeError::InvalidPacketType(15));
        }
        if payload.is_empty() {
            return Ok(Packet::Auth(Auth::default()));
        }
        let (reason_code, properties) = reason_and_properties(payload)?;
        Ok(Packet::Auth(Auth { reason_code, properties }))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
