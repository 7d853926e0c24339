//! Shared MQTT vocabulary: packet types, QoS, protocol version, and the
//! per-packet structs that `codec` reads and writes.
//!
//! Everything in this module is version-agnostic scaffolding. Where v3.1.1
//! and v5.0 diverge (properties, reason codes), the codec consults
//! `ProtocolVersion` at encode/decode time rather than this module branching
//! on it.

mod error;
mod packet;
mod properties;
mod reason;

pub use error::{DecodeError, EncodeError, ProtocolError};
pub use packet::*;
pub use properties::{Properties, Property};
pub use reason::ReasonCode;

/// Which MQTT revision a connection negotiated during CONNECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProtocolVersion {
    /// Protocol level 4.
    V311 = 4,
    /// Protocol level 5, adds properties, reason codes, and shared
    /// subscriptions.
    V5 = 5,
}

impl ProtocolVersion {
    pub fn from_u8(level: u8) -> Option<Self> {
        match level {
            4 => Some(Self::V311),
            5 => Some(Self::V5),
            _ => None,
        }
    }
}

/// MQTT delivery guarantee for a PUBLISH or subscription.
///
/// Ordered so that `QoS::AtMostOnce < QoS::AtLeastOnce < QoS::ExactlyOnce`,
/// which is what makes [`QoS::min`] usable directly for subscription
/// matching (a subscriber never receives a higher QoS than it asked for).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    pub fn from_u8(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }

    /// Caps a publish's QoS to what a matching subscription requested.
    pub fn min(self, other: Self) -> Self {
        std::cmp::min(self, other)
    }
}

/// v5.0 control over whether retained messages are replayed on subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RetainHandling {
    #[default]
    SendAtSubscribe = 0,
    /// Only deliver retained messages the first time a filter is subscribed.
    SendAtSubscribeIfNew = 1,
    DoNotSend = 2,
}

impl RetainHandling {
    pub fn from_u8(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::SendAtSubscribe),
            1 => Some(Self::SendAtSubscribeIfNew),
            2 => Some(Self::DoNotSend),
            _ => None,
        }
    }
}

/// The options byte attached to each filter in a SUBSCRIBE packet.
///
/// v3.1.1 only ever sets `qos`; `no_local`, `retain_as_published`, and
/// `retain_handling` are v5.0 additions packed into the same byte on the
/// wire, bits 2-3 and 4-5 respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub qos: QoS,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            qos: QoS::AtMostOnce,
            no_local: false,
            retain_as_published: false,
            retain_handling: RetainHandling::SendAtSubscribe,
        }
    }
}

impl SubscriptionOptions {
    /// Parses a SUBSCRIBE options byte, rejecting reserved bits 6-7.
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte & 0xC0 != 0 {
            return None;
        }

        Some(Self {
            qos: QoS::from_u8(byte & 0x03)?,
            no_local: byte & 0x04 != 0,
            retain_as_published: byte & 0x08 != 0,
            retain_handling: RetainHandling::from_u8((byte >> 4) & 0x03)?,
        })
    }

    pub fn to_byte(self) -> u8 {
        self.qos as u8
            | (self.no_local as u8) << 2
            | (self.retain_as_published as u8) << 3
            | (self.retain_handling as u8) << 4
    }
}

/// The packet type nibble carried in the high bits of the fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
    Auth = 15,
}

impl PacketType {
    pub fn from_u8(nibble: u8) -> Option<Self> {
        const TYPES: [PacketType; 15] = [
            PacketType::Connect,
            PacketType::ConnAck,
            PacketType::Publish,
            PacketType::PubAck,
            PacketType::PubRec,
            PacketType::PubRel,
            PacketType::PubComp,
            PacketType::Subscribe,
            PacketType::SubAck,
            PacketType::Unsubscribe,
            PacketType::UnsubAck,
            PacketType::PingReq,
            PacketType::PingResp,
            PacketType::Disconnect,
            PacketType::Auth,
        ];
        TYPES.get(nibble.checked_sub(1)? as usize).copied()
    }
}
