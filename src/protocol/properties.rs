//! v5.0 properties: the variable-length, mostly-optional metadata block
//! that can follow the variable header of most v5 packets.
//!
//! A properties block on the wire is a variable-length-int byte count
//! followed by that many bytes of `(identifier, value)` pairs, where the
//! identifier is itself a variable-length int (though every identifier
//! MQTT defines fits in one byte). [`Properties`] is the decoded,
//! random-access form the rest of the codec works with; [`Property`]/
//! [`PropertyId`] exist for code that wants to work with one property at a
//! time rather than the whole struct.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{
    read_binary, read_string, read_variable_int, variable_int_len, write_binary, write_string,
    write_variable_int,
};
use crate::protocol::{DecodeError, EncodeError};

/// The one-byte identifier prefixing each property's value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PropertyId {
    PayloadFormatIndicator = 0x01,
    MessageExpiryInterval = 0x02,
    ContentType = 0x03,
    ResponseTopic = 0x08,
    CorrelationData = 0x09,
    SubscriptionIdentifier = 0x0B,
    SessionExpiryInterval = 0x11,
    AssignedClientIdentifier = 0x12,
    ServerKeepAlive = 0x13,
    AuthenticationMethod = 0x15,
    AuthenticationData = 0x16,
    RequestProblemInformation = 0x17,
    WillDelayInterval = 0x18,
    RequestResponseInformation = 0x19,
    ResponseInformation = 0x1A,
    ServerReference = 0x1C,
    ReasonString = 0x1F,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    TopicAlias = 0x23,
    MaximumQoS = 0x24,
    RetainAvailable = 0x25,
    UserProperty = 0x26,
    MaximumPacketSize = 0x27,
    WildcardSubscriptionAvailable = 0x28,
    SubscriptionIdentifierAvailable = 0x29,
    SharedSubscriptionAvailable = 0x2A,
}

impl PropertyId {
    pub fn from_u8(byte: u8) -> Option<Self> {
        use PropertyId::*;
        Some(match byte {
            0x01 => PayloadFormatIndicator,
            0x02 => MessageExpiryInterval,
            0x03 => ContentType,
            0x08 => ResponseTopic,
            0x09 => CorrelationData,
            0x0B => SubscriptionIdentifier,
            0x11 => SessionExpiryInterval,
            0x12 => AssignedClientIdentifier,
            0x13 => ServerKeepAlive,
            0x15 => AuthenticationMethod,
            0x16 => AuthenticationData,
            0x17 => RequestProblemInformation,
            0x18 => WillDelayInterval,
            0x19 => RequestResponseInformation,
            0x1A => ResponseInformation,
            0x1C => ServerReference,
            0x1F => ReasonString,
            0x21 => ReceiveMaximum,
            0x22 => TopicAliasMaximum,
            0x23 => TopicAlias,
            0x24 => MaximumQoS,
            0x25 => RetainAvailable,
            0x26 => UserProperty,
            0x27 => MaximumPacketSize,
            0x28 => WildcardSubscriptionAvailable,
            0x29 => SubscriptionIdentifierAvailable,
            0x2A => SharedSubscriptionAvailable,
            _ => return None,
        })
    }
}

/// A single decoded property value, for call sites that want to work one
/// property at a time instead of through the flattened [`Properties`]
/// struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    PayloadFormatIndicator(u8),
    MessageExpiryInterval(u32),
    ContentType(String),
    ResponseTopic(String),
    CorrelationData(Bytes),
    SubscriptionIdentifier(u32),
    SessionExpiryInterval(u32),
    AssignedClientIdentifier(String),
    ServerKeepAlive(u16),
    AuthenticationMethod(String),
    AuthenticationData(Bytes),
    RequestProblemInformation(u8),
    WillDelayInterval(u32),
    RequestResponseInformation(u8),
    ResponseInformation(String),
    ServerReference(String),
    ReasonString(String),
    ReceiveMaximum(u16),
    TopicAliasMaximum(u16),
    TopicAlias(u16),
    MaximumQoS(u8),
    RetainAvailable(u8),
    UserProperty(String, String),
    MaximumPacketSize(u32),
    WildcardSubscriptionAvailable(u8),
    SubscriptionIdentifierAvailable(u8),
    SharedSubscriptionAvailable(u8),
}

impl Property {
    pub fn id(&self) -> PropertyId {
        match self {
            Property::PayloadFormatIndicator(_) => PropertyId::PayloadFormatIndicator,
            Property::MessageExpiryInterval(_) => PropertyId::MessageExpiryInterval,
            Property::ContentType(_) => PropertyId::ContentType,
            Property::ResponseTopic(_) => PropertyId::ResponseTopic,
            Property::CorrelationData(_) => PropertyId::CorrelationData,
            Property::SubscriptionIdentifier(_) => PropertyId::SubscriptionIdentifier,
            Property::SessionExpiryInterval(_) => PropertyId::SessionExpiryInterval,
            Property::AssignedClientIdentifier(_) => PropertyId::AssignedClientIdentifier,
            Property::ServerKeepAlive(_) => PropertyId::ServerKeepAlive,
            Property::AuthenticationMethod(_) => PropertyId::AuthenticationMethod,
            Property::AuthenticationData(_) => PropertyId::AuthenticationData,
            Property::RequestProblemInformation(_) => PropertyId::RequestProblemInformation,
            Property::WillDelayInterval(_) => PropertyId::WillDelayInterval,
            Property::RequestResponseInformation(_) => PropertyId::RequestResponseInformation,
            Property::ResponseInformation(_) => PropertyId::ResponseInformation,
            Property::ServerReference(_) => PropertyId::ServerReference,
            Property::ReasonString(_) => PropertyId::ReasonString,
            Property::ReceiveMaximum(_) => PropertyId::ReceiveMaximum,
            Property::TopicAliasMaximum(_) => PropertyId::TopicAliasMaximum,
            Property::TopicAlias(_) => PropertyId::TopicAlias,
            Property::MaximumQoS(_) => PropertyId::MaximumQoS,
            Property::RetainAvailable(_) => PropertyId::RetainAvailable,
            Property::UserProperty(_, _) => PropertyId::UserProperty,
            Property::MaximumPacketSize(_) => PropertyId::MaximumPacketSize,
            Property::WildcardSubscriptionAvailable(_) => PropertyId::WildcardSubscriptionAvailable,
            Property::SubscriptionIdentifierAvailable(_) => {
                PropertyId::SubscriptionIdentifierAvailable
            }
            Property::SharedSubscriptionAvailable(_) => PropertyId::SharedSubscriptionAvailable,
        }
    }

    pub fn encoded_size(&self) -> usize {
        1 + match self {
            Property::PayloadFormatIndicator(_) => 1,
            Property::MessageExpiryInterval(_) => 4,
            Property::ContentType(s) => 2 + s.len(),
            Property::ResponseTopic(s) => 2 + s.len(),
            Property::CorrelationData(d) => 2 + d.len(),
            Property::SubscriptionIdentifier(v) => variable_int_len(*v),
            Property::SessionExpiryInterval(_) => 4,
            Property::AssignedClientIdentifier(s) => 2 + s.len(),
            Property::ServerKeepAlive(_) => 2,
            Property::AuthenticationMethod(s) => 2 + s.len(),
            Property::AuthenticationData(d) => 2 + d.len(),
            Property::RequestProblemInformation(_) => 1,
            Property::WillDelayInterval(_) => 4,
            Property::RequestResponseInformation(_) => 1,
            Property::ResponseInformation(s) => 2 + s.len(),
            Property::ServerReference(s) => 2 + s.len(),
            Property::ReasonString(s) => 2 + s.len(),
            Property::ReceiveMaximum(_) => 2,
            Property::TopicAliasMaximum(_) => 2,
            Property::TopicAlias(_) => 2,
            Property::MaximumQoS(_) => 1,
            Property::RetainAvailable(_) => 1,
            Property::UserProperty(k, v) => 4 + k.len() + v.len(),
            Property::MaximumPacketSize(_) => 4,
            Property::WildcardSubscriptionAvailable(_) => 1,
            Property::SubscriptionIdentifierAvailable(_) => 1,
            Property::SharedSubscriptionAvailable(_) => 1,
        }
    }
}

/// The decoded properties block for one packet. Every field is optional
/// (or an empty `Vec`) because v3.1.1 packets and most v5 packets carry
/// none of this — only the fields a given packet type actually defines
/// get populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    pub payload_format_indicator: Option<u8>,
    pub message_expiry_interval: Option<u32>,
    pub content_type: Option<String>,
    pub response_topic: Option<String>,
    pub correlation_data: Option<Bytes>,
    pub subscription_identifiers: Vec<u32>,
    pub session_expiry_interval: Option<u32>,
    pub assigned_client_identifier: Option<String>,
    pub server_keep_alive: Option<u16>,
    pub authentication_method: Option<String>,
    pub authentication_data: Option<Bytes>,
    pub request_problem_information: Option<u8>,
    pub will_delay_interval: Option<u32>,
    pub request_response_information: Option<u8>,
    pub response_information: Option<String>,
    pub server_reference: Option<String>,
    pub reason_string: Option<String>,
    pub receive_maximum: Option<u16>,
    pub topic_alias_maximum: Option<u16>,
    pub topic_alias: Option<u16>,
    pub maximum_qos: Option<u8>,
    pub retain_available: Option<u8>,
    pub user_properties: Vec<(String, String)>,
    pub maximum_packet_size: Option<u32>,
    pub wildcard_subscription_available: Option<u8>,
    pub subscription_identifier_available: Option<u8>,
    pub shared_subscription_available: Option<u8>,
}

// --- encode-side helpers: one function per wire shape, so `encode` and
// `encoded_size` each read as a flat list of fields instead of repeating
// the same `if let Some(...) { write id; write value }` shape 22 times. ---

fn size_flag(id_and_value_len: usize, present: bool) -> usize {
    if present {
        id_and_value_len
    } else {
        0
    }
}

fn put_u8_prop(buf: &mut BytesMut, id: PropertyId, value: Option<u8>) {
    if let Some(v) = value {
        buf.put_u8(id as u8);
        buf.put_u8(v);
    }
}

fn put_u16_prop(buf: &mut BytesMut, id: PropertyId, value: Option<u16>) {
    if let Some(v) = value {
        buf.put_u8(id as u8);
        buf.put_u16(v);
    }
}

fn put_u32_prop(buf: &mut BytesMut, id: PropertyId, value: Option<u32>) {
    if let Some(v) = value {
        buf.put_u8(id as u8);
        buf.put_u32(v);
    }
}

fn put_str_prop(buf: &mut BytesMut, id: PropertyId, value: &Option<String>) -> Result<(), EncodeError> {
    if let Some(s) = value {
        buf.put_u8(id as u8);
        write_string(buf, s)?;
    }
    Ok(())
}

fn put_bin_prop(buf: &mut BytesMut, id: PropertyId, value: &Option<Bytes>) -> Result<(), EncodeError> {
    if let Some(d) = value {
        buf.put_u8(id as u8);
        write_binary(buf, d)?;
    }
    Ok(())
}

// --- decode-side helpers: reading a fixed-width value at `cursor` with a
// bounds check, and rejecting a property id that's already been seen
// (MQTT requires every property except SubscriptionIdentifier and
// UserProperty to appear at most once). ---

fn take_u8(buf: &[u8], cursor: usize, limit: usize) -> Result<(u8, usize), DecodeError> {
    if cursor >= limit {
        return Err(DecodeError::InsufficientData);
    }
    Ok((buf[cursor], 1))
}

fn take_u16(buf: &[u8], cursor: usize, limit: usize) -> Result<(u16, usize), DecodeError> {
    if cursor + 2 > limit {
        return Err(DecodeError::InsufficientData);
    }
    Ok((u16::from_be_bytes([buf[cursor], buf[cursor + 1]]), 2))
}

fn take_u32(buf: &[u8], cursor: usize, limit: usize) -> Result<(u32, usize), DecodeError> {
    if cursor + 4 > limit {
        return Err(DecodeError::InsufficientData);
    }
    Ok((
        u32::from_be_bytes([buf[cursor], buf[cursor + 1], buf[cursor + 2], buf[cursor + 3]]),
        4,
    ))
}

fn reject_if_set<T>(slot: &Option<T>, id: PropertyId) -> Result<(), DecodeError> {
    if slot.is_some() {
        return Err(DecodeError::DuplicateProperty(id as u8));
    }
    Ok(())
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Properties::default()
    }

    /// Size in bytes of the encoded property list, not counting the
    /// length prefix that precedes it on the wire.
    pub fn encoded_size(&self) -> usize {
        size_flag(2, self.payload_format_indicator.is_some())
            + size_flag(5, self.message_expiry_interval.is_some())
            + self.content_type.as_ref().map_or(0, |s| 3 + s.len())
            + self.response_topic.as_ref().map_or(0, |s| 3 + s.len())
            + self.correlation_data.as_ref().map_or(0, |d| 3 + d.len())
            + self
                .subscription_identifiers
                .iter()
                .map(|id| 1 + variable_int_len(*id))
                .sum::<usize>()
            + size_flag(5, self.session_expiry_interval.is_some())
            + self.assigned_client_identifier.as_ref().map_or(0, |s| 3 + s.len())
            + size_flag(3, self.server_keep_alive.is_some())
            + self.authentication_method.as_ref().map_or(0, |s| 3 + s.len())
            + self.authentication_data.as_ref().map_or(0, |d| 3 + d.len())
            + size_flag(2, self.request_problem_information.is_some())
            + size_flag(5, self.will_delay_interval.is_some())
            + size_flag(2, self.request_response_information.is_some())
            + self.response_information.as_ref().map_or(0, |s| 3 + s.len())
            + self.server_reference.as_ref().map_or(0, |s| 3 + s.len())
            + self.reason_string.as_ref().map_or(0, |s| 3 + s.len())
            + size_flag(3, self.receive_maximum.is_some())
            + size_flag(3, self.topic_alias_maximum.is_some())
            + size_flag(3, self.topic_alias.is_some())
            + size_flag(2, self.maximum_qos.is_some())
            + size_flag(2, self.retain_available.is_some())
            + self
                .user_properties
                .iter()
                .map(|(k, v)| 5 + k.len() + v.len())
                .sum::<usize>()
            + size_flag(5, self.maximum_packet_size.is_some())
            + size_flag(2, self.wildcard_subscription_available.is_some())
            + size_flag(2, self.subscription_identifier_available.is_some())
            + size_flag(2, self.shared_subscription_available.is_some())
    }

    /// Decodes a properties block starting at `buf[0]`. Returns the
    /// decoded struct plus the total number of bytes consumed, including
    /// the leading length prefix.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError::InsufficientData);
        }

        let (declared_len, prefix_len) = read_variable_int(buf)?;
        let limit = prefix_len + declared_len as usize;
        if buf.len() < limit {
            return Err(DecodeError::InsufficientData);
        }

        let mut props = Properties::new();
        let mut cursor = prefix_len;

        while cursor < limit {
            let (raw_id, id_len) = read_variable_int(&buf[cursor..])?;
            cursor += id_len;

            let id = PropertyId::from_u8(raw_id as u8)
                .ok_or(DecodeError::InvalidPropertyId(raw_id as u8))?;

            use PropertyId::*;
            match id {
                PayloadFormatIndicator => {
                    reject_if_set(&props.payload_format_indicator, id)?;
                    let (v, n) = take_u8(buf, cursor, limit)?;
                    props.payload_format_indicator = Some(v);
                    cursor += n;
                }
                MessageExpiryInterval => {
                    reject_if_set(&props.message_expiry_interval, id)?;
                    let (v, n) = take_u32(buf, cursor, limit)?;
                    props.message_expiry_interval = Some(v);
                    cursor += n;
                }
                ContentType => {
                    reject_if_set(&props.content_type, id)?;
                    let (s, n) = read_string(&buf[cursor..])?;
                    props.content_type = Some(s.into());
                    cursor += n;
                }
                ResponseTopic => {
                    reject_if_set(&props.response_topic, id)?;
                    let (s, n) = read_string(&buf[cursor..])?;
                    props.response_topic = Some(s.into());
                    cursor += n;
                }
                CorrelationData => {
                    reject_if_set(&props.correlation_data, id)?;
                    let (data, n) = read_binary(&buf[cursor..])?;
                    props.correlation_data = Some(Bytes::copy_from_slice(data));
                    cursor += n;
                }
                SubscriptionIdentifier => {
                    let (val, n) = read_variable_int(&buf[cursor..])?;
                    if val == 0 {
                        return Err(DecodeError::MalformedPacket(
                            "subscription identifier cannot be 0",
                        ));
                    }
                    props.subscription_identifiers.push(val);
                    cursor += n;
                }
                SessionExpiryInterval => {
                    reject_if_set(&props.session_expiry_interval, id)?;
                    let (v, n) = take_u32(buf, cursor, limit)?;
                    props.session_expiry_interval = Some(v);
                    cursor += n;
                }
                AssignedClientIdentifier => {
                    reject_if_set(&props.assigned_client_identifier, id)?;
                    let (s, n) = read_string(&buf[cursor..])?;
                    props.assigned_client_identifier = Some(s.into());
                    cursor += n;
                }
                ServerKeepAlive => {
                    reject_if_set(&props.server_keep_alive, id)?;
                    let (v, n) = take_u16(buf, cursor, limit)?;
                    props.server_keep_alive = Some(v);
                    cursor += n;
                }
                AuthenticationMethod => {
                    reject_if_set(&props.authentication_method, id)?;
                    let (s, n) = read_string(&buf[cursor..])?;
                    props.authentication_method = Some(s.into());
                    cursor += n;
                }
                AuthenticationData => {
                    reject_if_set(&props.authentication_data, id)?;
                    let (data, n) = read_binary(&buf[cursor..])?;
                    props.authentication_data = Some(Bytes::copy_from_slice(data));
                    cursor += n;
                }
                RequestProblemInformation => {
                    reject_if_set(&props.request_problem_information, id)?;
                    let (v, n) = take_u8(buf, cursor, limit)?;
                    props.request_problem_information = Some(v);
                    cursor += n;
                }
                WillDelayInterval => {
                    reject_if_set(&props.will_delay_interval, id)?;
                    let (v, n) = take_u32(buf, cursor, limit)?;
                    props.will_delay_interval = Some(v);
                    cursor += n;
                }
                RequestResponseInformation => {
                    reject_if_set(&props.request_response_information, id)?;
                    let (v, n) = take_u8(buf, cursor, limit)?;
                    props.request_response_information = Some(v);
                    cursor += n;
                }
                ResponseInformation => {
                    reject_if_set(&props.response_information, id)?;
                    let (s, n) = read_string(&buf[cursor..])?;
                    props.response_information = Some(s.into());
                    cursor += n;
                }
                ServerReference => {
                    reject_if_set(&props.server_reference, id)?;
                    let (s, n) = read_string(&buf[cursor..])?;
                    props.server_reference = Some(s.into());
                    cursor += n;
                }
                ReasonString => {
                    reject_if_set(&props.reason_string, id)?;
                    let (s, n) = read_string(&buf[cursor..])?;
                    props.reason_string = Some(s.into());
                    cursor += n;
                }
                ReceiveMaximum => {
                    reject_if_set(&props.receive_maximum, id)?;
                    let (v, n) = take_u16(buf, cursor, limit)?;
                    if v == 0 {
                        return Err(DecodeError::MalformedPacket("receive maximum cannot be 0"));
                    }
                    props.receive_maximum = Some(v);
                    cursor += n;
                }
                TopicAliasMaximum => {
                    reject_if_set(&props.topic_alias_maximum, id)?;
                    let (v, n) = take_u16(buf, cursor, limit)?;
                    props.topic_alias_maximum = Some(v);
                    cursor += n;
                }
                TopicAlias => {
                    reject_if_set(&props.topic_alias, id)?;
                    let (v, n) = take_u16(buf, cursor, limit)?;
                    if v == 0 {
                        return Err(DecodeError::MalformedPacket("topic alias cannot be 0"));
                    }
                    props.topic_alias = Some(v);
                    cursor += n;
                }
                MaximumQoS => {
                    reject_if_set(&props.maximum_qos, id)?;
                    let (v, n) = take_u8(buf, cursor, limit)?;
                    props.maximum_qos = Some(v);
                    cursor += n;
                }
                RetainAvailable => {
                    reject_if_set(&props.retain_available, id)?;
                    let (v, n) = take_u8(buf, cursor, limit)?;
                    props.retain_available = Some(v);
                    cursor += n;
                }
                UserProperty => {
                    let (key, key_len) = read_string(&buf[cursor..])?;
                    cursor += key_len;
                    let (val, val_len) = read_string(&buf[cursor..])?;
                    cursor += val_len;
                    props.user_properties.push((key.to_string(), val.to_string()));
                }
                MaximumPacketSize => {
                    reject_if_set(&props.maximum_packet_size, id)?;
                    let (v, n) = take_u32(buf, cursor, limit)?;
                    if v == 0 {
                        return Err(DecodeError::MalformedPacket(
                            "maximum packet size cannot be 0",
                        ));
                    }
                    props.maximum_packet_size = Some(v);
                    cursor += n;
                }
                WildcardSubscriptionAvailable => {
                    reject_if_set(&props.wildcard_subscription_available, id)?;
                    let (v, n) = take_u8(buf, cursor, limit)?;
                    props.wildcard_subscription_available = Some(v);
                    cursor += n;
                }
                SubscriptionIdentifierAvailable => {
                    reject_if_set(&props.subscription_identifier_available, id)?;
                    let (v, n) = take_u8(buf, cursor, limit)?;
                    props.subscription_identifier_available = Some(v);
                    cursor += n;
                }
                SharedSubscriptionAvailable => {
                    reject_if_set(&props.shared_subscription_available, id)?;
                    let (v, n) = take_u8(buf, cursor, limit)?;
                    props.shared_subscription_available = Some(v);
                    cursor += n;
                }
            }
        }

        Ok((props, limit))
    }

    /// Encodes the length prefix followed by every populated property, in
    /// a fixed field order (the order doesn't matter to the spec, but it
    /// must be deterministic for `encoded_size` to stay in sync).
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        write_variable_int(buf, self.encoded_size() as u32)?;

        use PropertyId::*;
        put_u8_prop(buf, PayloadFormatIndicator, self.payload_format_indicator);
        put_u32_prop(buf, MessageExpiryInterval, self.message_expiry_interval);
        put_str_prop(buf, ContentType, &self.content_type)?;
        put_str_prop(buf, ResponseTopic, &self.response_topic)?;
        put_bin_prop(buf, CorrelationData, &self.correlation_data)?;
        for id in &self.subscription_identifiers {
            buf.put_u8(SubscriptionIdentifier as u8);
            write_variable_int(buf, *id)?;
        }
        put_u32_prop(buf, SessionExpiryInterval, self.session_expiry_interval);
        put_str_prop(buf, AssignedClientIdentifier, &self.assigned_client_identifier)?;
        put_u16_prop(buf, ServerKeepAlive, self.server_keep_alive);
        put_str_prop(buf, AuthenticationMethod, &self.authentication_method)?;
        put_bin_prop(buf, AuthenticationData, &self.authentication_data)?;
        put_u8_prop(buf, RequestProblemInformation, self.request_problem_information);
        put_u32_prop(buf, WillDelayInterval, self.will_delay_interval);
        put_u8_prop(buf, RequestResponseInformation, self.request_response_information);
        put_str_prop(buf, ResponseInformation, &self.response_information)?;
        put_str_prop(buf, ServerReference, &self.server_reference)?;
        put_str_prop(buf, ReasonString, &self.reason_string)?;
        put_u16_prop(buf, ReceiveMaximum, self.receive_maximum);
        put_u16_prop(buf, TopicAliasMaximum, self.topic_alias_maximum);
        put_u16_prop(buf, TopicAlias, self.topic_alias);
        put_u8_prop(buf, MaximumQoS, self.maximum_qos);
        put_u8_prop(buf, RetainAvailable, self.retain_available);
        for (k, v) in &self.user_properties {
            buf.put_u8(UserProperty as u8);
            write_string(buf, k)?;
            write_string(buf, v)?;
        }
        put_u32_prop(buf, MaximumPacketSize, self.maximum_packet_size);
        put_u8_prop(
            buf,
            WildcardSubscriptionAvailable,
            self.wildcard_subscription_available,
        );
        put_u8_prop(
            buf,
            SubscriptionIdentifierAvailable,
            self.subscription_identifier_available,
        );
        put_u8_prop(
            buf,
            SharedSubscriptionAvailable,
            self.shared_subscription_available,
        );

        Ok(())
    }
}
