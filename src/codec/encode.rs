//! Serializes [`Packet`] values to bytes.
//!
//! Every `encode_*` method computes the remaining-length up front (MQTT's
//! fixed header needs the total body size before any of the body is
//! written, since the length prefix precedes it) and then writes the
//! fixed header followed by the body in one pass — no backpatching.

use bytes::{BufMut, BytesMut};

use super::{variable_int_len, write_binary, write_string, write_variable_int};
use crate::protocol::{
    Auth, ConnAck, Connect, Disconnect, EncodeError, Packet, Properties, ProtocolVersion, Publish,
    QoS, ReasonCode, SubAck, Subscribe, UnsubAck, Unsubscribe,
};

pub struct Encoder {
    protocol_version: ProtocolVersion,
}

impl Encoder {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { protocol_version: version }
    }

    pub fn set_protocol_version(&mut self, version: ProtocolVersion) {
        self.protocol_version = version;
    }

    fn is_v5(&self) -> bool {
        self.protocol_version == ProtocolVersion::V5
    }

    pub fn encode(&self, packet: &Packet, buf: &mut BytesMut) -> Result<(), EncodeError> {
        match packet {
            Packet::Connect(p) => self.encode_connect(p, buf),
            Packet::ConnAck(p) => self.encode_connack(p, buf),
            Packet::Publish(p) => self.encode_publish(p, buf),
            Packet::PubAck(p) => self.encode_qos_ack(buf, 0x40, p.packet_id, p.reason_code, &p.properties),
            Packet::PubRec(p) => self.encode_qos_ack(buf, 0x50, p.packet_id, p.reason_code, &p.properties),
            Packet::PubRel(p) => self.encode_qos_ack(buf, 0x62, p.packet_id, p.reason_code, &p.properties),
            Packet::PubComp(p) => self.encode_qos_ack(buf, 0x70, p.packet_id, p.reason_code, &p.properties),
            Packet::Subscribe(p) => self.encode_subscribe(p, buf),
            Packet::SubAck(p) => self.encode_suback(p, buf),
            Packet::Unsubscribe(p) => self.encode_unsubscribe(p, buf),
            Packet::UnsubAck(p) => self.encode_unsuback(p, buf),
            Packet::PingReq => {
                buf.put_u8(0xC0);
                buf.put_u8(0x00);
                Ok(())
            }
            Packet::PingResp => {
                buf.put_u8(0xD0);
                buf.put_u8(0x00);
                Ok(())
            }
            Packet::Disconnect(p) => self.encode_disconnect(p, buf),
            Packet::Auth(p) => self.encode_auth(p, buf),
        }
    }

    fn encode_connect(&self, packet: &Connect, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let is_v5 = packet.protocol_version == ProtocolVersion::V5;
        let mut remaining_length = 6 + 1 + 1 + 2; // "MQTT" + version + connect flags + keep alive

        if is_v5 {
            let len = packet.properties.encoded_size();
            remaining_length += variable_int_len(len as u32) + len;
        }

        remaining_length += 2 + packet.client_id.len();

        if let Some(ref will) = packet.will {
            if is_v5 {
                let will_props_len = will.properties.encoded_size();
                remaining_length += variable_int_len(will_props_len as u32) + will_props_len;
            }
            remaining_length += 2 + will.topic.len();
            remaining_length += 2 + will.payload.len();
        }

        if let Some(ref username) = packet.username {
            remaining_length += 2 + username.len();
        }
        if let Some(ref password) = packet.password {
            remaining_length += 2 + password.len();
        }

        buf.put_u8(0x10);
        write_variable_int(buf, remaining_length as u32)?;

        write_string(buf, "MQTT")?;
        buf.put_u8(packet.protocol_version as u8);

        let mut connect_flags: u8 = 0;
        if packet.clean_start {
            connect_flags |= 0x02;
        }
        if let Some(ref will) = packet.will {
            connect_flags |= 0x04;
            connect_flags |= (will.qos as u8) << 3;
            if will.retain {
                connect_flags |= 0x20;
            }
        }
        if packet.password.is_some() {
            connect_flags |= 0x40;
        }
        if packet.username.is_some() {
            connect_flags |= 0x80;
        }
        buf.put_u8(connect_flags);

        buf.put_u16(packet.keep_alive);

        if is_v5 {
            packet.properties.encode(buf)?;
        }

        write_string(buf, &packet.client_id)?;

        if let Some(ref will) = packet.will {
            if is_v5 {
                will.properties.encode(buf)?;
            }
            write_string(buf, &will.topic)?;
            write_binary(buf, &will.payload)?;
        }

        if let Some(ref username) = packet.username {
            write_string(buf, username)?;
        }
        if let Some(ref password) = packet.password {
            write_binary(buf, password)?;
        }

        Ok(())
    }

    fn encode_connack(&self, packet: &ConnAck, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let is_v5 = self.is_v5();
        let mut remaining_length = 2; // ack flags + reason/return code

        if is_v5 {
            let props_len = packet.properties.encoded_size();
            remaining_length += variable_int_len(props_len as u32) + props_len;
        }

        buf.put_u8(0x20);
        write_variable_int(buf, remaining_length as u32)?;
        buf.put_u8(if packet.session_present { 0x01 } else { 0x00 });

        if is_v5 {
            buf.put_u8(packet.reason_code as u8);
            packet.properties.encode(buf)?;
        } else {
            buf.put_u8(packet.reason_code.to_v3_connack_code());
        }

        Ok(())
    }

    fn encode_publish(&self, packet: &Publish, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let is_v5 = self.is_v5();
        let mut remaining_length = 2 + packet.topic.len();

        if packet.qos != QoS::AtMostOnce {
            remaining_length += 2;
        }
        if is_v5 {
            let props_len = packet.properties.encoded_size();
            remaining_length += variable_int_len(props_len as u32) + props_len;
        }
        remaining_length += packet.payload.len();

        let mut first_byte: u8 = 0x30;
        if packet.dup {
            first_byte |= 0x08;
        }
        first_byte |= (packet.qos as u8) << 1;
        if packet.retain {
            first_byte |= 0x01;
        }
        buf.put_u8(first_byte);
        write_variable_int(buf, remaining_length as u32)?;

        write_string(buf, &packet.topic)?;
        if let Some(packet_id) = packet.packet_id {
            buf.put_u16(packet_id);
        }
        if is_v5 {
            packet.properties.encode(buf)?;
        }
        buf.put_slice(&packet.payload);

        Ok(())
    }

    /// Shared body for PUBACK/PUBREC/PUBREL/PUBCOMP. v3.1.1 (and v5 with
    /// a plain success/no-properties reply) write only the 2-byte packet
    /// identifier; v5 with anything else to say also writes the reason
    /// code and, if present, properties.
    fn encode_qos_ack(
        &self,
        buf: &mut BytesMut,
        first_byte: u8,
        packet_id: u16,
        reason_code: ReasonCode,
        properties: &Properties,
    ) -> Result<(), EncodeError> {
        if !self.is_v5() || (reason_code == ReasonCode::Success && properties.is_empty()) {
            buf.put_u8(first_byte);
            buf.put_u8(0x02);
            buf.put_u16(packet_id);
            return Ok(());
        }

        let props_len = properties.encoded_size();
        let has_props = props_len > 0;
        let remaining_length = if has_props {
            3 + variable_int_len(props_len as u32) + props_len
        } else {
            3
        };

        buf.put_u8(first_byte);
        write_variable_int(buf, remaining_length as u32)?;
        buf.put_u16(packet_id);
        buf.put_u8(reason_code as u8);
        if has_props {
            properties.encode(buf)?;
        }
        Ok(())
    }

    fn encode_subscribe(&self, packet: &Subscribe, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let is_v5 = self.is_v5();
        let mut remaining_length = 2;

        if is_v5 {
            let props_len = packet.properties.encoded_size();
            remaining_length += variable_int_len(props_len as u32) + props_len;
        }
        for sub in &packet.subscriptions {
            remaining_length += 2 + sub.filter.len() + 1;
        }

        buf.put_u8(0x82);
        write_variable_int(buf, remaining_length as u32)?;
        buf.put_u16(packet.packet_id);

        if is_v5 {
            packet.properties.encode(buf)?;
        }

        for sub in &packet.subscriptions {
            write_string(buf, &sub.filter)?;
            if is_v5 {
                buf.put_u8(sub.options.to_byte());
            } else {
                buf.put_u8(sub.options.qos as u8);
            }
        }

        Ok(())
    }

    fn encode_suback(&self, packet: &SubAck, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let is_v5 = self.is_v5();
        let mut remaining_length = 2;

        if is_v5 {
            let props_len = packet.properties.encoded_size();
            remaining_length += variable_int_len(props_len as u32) + props_len;
        }
        remaining_length += packet.reason_codes.len();

        buf.put_u8(0x90);
        write_variable_int(buf, remaining_length as u32)?;
        buf.put_u16(packet.packet_id);

        if is_v5 {
            packet.properties.encode(buf)?;
        }

        for code in &packet.reason_codes {
            if is_v5 {
                buf.put_u8(*code as u8);
            } else {
                let v3_code = match code {
                    ReasonCode::Success => 0x00,
                    ReasonCode::GrantedQoS1 => 0x01,
                    ReasonCode::GrantedQoS2 => 0x02,
                    _ => 0x80,
                };
                buf.put_u8(v3_code);
            }
        }

        Ok(())
    }

    fn encode_unsubscribe(&self, packet: &Unsubscribe, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let is_v5 = self.is_v5();
        let mut remaining_length = 2;

        if is_v5 {
            let props_len = packet.properties.encoded_size();
            remaining_length += variable_int_len(props_len as u32) + props_len;
        }
        for filter in &packet.filters {
            remaining_length += 2 + filter.len();
        }

        buf.put_u8(0xA2);
        write_variable_int(buf, remaining_length as u32)?;
        buf.put_u16(packet.packet_id);

        if is_v5 {
            packet.properties.encode(buf)?;
        }
        for filter in &packet.filters {
            write_string(buf, filter)?;
        }

        Ok(())
    }

    fn encode_unsuback(&self, packet: &UnsubAck, buf: &mut BytesMut) -> Result<(), EncodeError> {
        if !self.is_v5() {
            buf.put_u8(0xB0);
            buf.put_u8(0x02);
            buf.put_u16(packet.packet_id);
            return Ok(());
        }

        let props_len = packet.properties.encoded_size();
        let remaining_length =
            2 + variable_int_len(props_len as u32) + props_len + packet.reason_codes.len();

        buf.put_u8(0xB0);
        write_variable_int(buf, remaining_length as u32)?;
        buf.put_u16(packet.packet_id);
        packet.properties.encode(buf)?;
        for code in &packet.reason_codes {
            buf.put_u8(*code as u8);
        }

        Ok(())
    }

    /// Shared body for DISCONNECT/AUTH: a bare reason code, with
    /// properties tacked on if there are any, and the whole body omitted
    /// (remaining length 0) when there's nothing but a success code to
    /// report.
    fn encode_reason_packet(
        &self,
        buf: &mut BytesMut,
        first_byte: u8,
        reason_code: ReasonCode,
        properties: &Properties,
    ) -> Result<(), EncodeError> {
        let has_reason = reason_code != ReasonCode::Success || !properties.is_empty();
        if !has_reason {
            buf.put_u8(first_byte);
            buf.put_u8(0x00);
            return Ok(());
        }

        let props_len = properties.encoded_size();
        let has_props = props_len > 0;
        let remaining_length = if has_props {
            1 + variable_int_len(props_len as u32) + props_len
        } else {
            1
        };

        buf.put_u8(first_byte);
        write_variable_int(buf, remaining_length as u32)?;
        buf.put_u8(reason_code as u8);
        if has_props {
            properties.encode(buf)?;
        }
        Ok(())
    }

    fn encode_disconnect(&self, packet: &Disconnect, buf: &mut BytesMut) -> Result<(), EncodeError> {
        if !self.is_v5() {
            buf.put_u8(0xE0);
            buf.put_u8(0x00);
            return Ok(());
        }
        self.encode_reason_packet(buf, 0xE0, packet.reason_code, &packet.properties)
    }

    fn encode_auth(&self, packet: &Auth, buf: &mut BytesMut) -> Result<(), EncodeError> {
        if !self.is_v5() {
            // AUTH doesn't exist in v3.1.1; reaching here means the
            // connection handler tried to send one on a v3.1.1 link,
            // which is a bug upstream of the codec rather than something
            // a wire-format error code describes well.
            return Err(EncodeError::PacketTooLarge);
        }
        self.encode_reason_packet(buf, 0xF0, packet.reason_code, &packet.properties)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(ProtocolVersion::V5)
    }
}
