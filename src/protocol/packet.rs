//! The packet types themselves — one struct or unit variant per MQTT
//! control packet, shared between v3.1.1 and v5.0. Fields that only exist
//! on the wire in v5 (`properties`, most `reason_code`s) are still present
//! for v3.1.1 values; the codec just never reads or writes them in that
//! mode.

use std::sync::Arc;

use bytes::Bytes;

use super::{Properties, ProtocolVersion, QoS, ReasonCode, SubscriptionOptions};

/// Every decoded packet, tagged by its MQTT control packet type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Packet {
    Connect(Box<Connect>),
    ConnAck(ConnAck),
    Publish(Publish),
    PubAck(PubAck),
    PubRec(PubRec),
    PubRel(PubRel),
    PubComp(PubComp),
    Subscribe(Subscribe),
    SubAck(SubAck),
    Unsubscribe(Unsubscribe),
    UnsubAck(UnsubAck),
    PingReq,
    PingResp,
    Disconnect(Disconnect),
    Auth(Auth),
}

impl Packet {
    /// The fixed-header packet type nibble for this packet, 1-15.
    pub fn packet_type(&self) -> u8 {
        match self {
            Packet::Connect(_) => 1,
            Packet::ConnAck(_) => 2,
            Packet::Publish(_) => 3,
            Packet::PubAck(_) => 4,
            Packet::PubRec(_) => 5,
            Packet::PubRel(_) => 6,
            Packet::PubComp(_) => 7,
            Packet::Subscribe(_) => 8,
            Packet::SubAck(_) => 9,
            Packet::Unsubscribe(_) => 10,
            Packet::UnsubAck(_) => 11,
            Packet::PingReq => 12,
            Packet::PingResp => 13,
            Packet::Disconnect(_) => 14,
            Packet::Auth(_) => 15,
        }
    }
}

/// Client's opening packet: identity, session options, and the last-will
/// registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    pub protocol_version: ProtocolVersion,
    pub client_id: String,
    /// `clean_start` in v5 terms; same field in v3.1.1 is called "clean
    /// session" but has identical semantics.
    pub clean_start: bool,
    pub keep_alive: u16,
    pub username: Option<String>,
    pub password: Option<Bytes>,
    pub will: Option<Will>,
    pub properties: Properties,
}

impl Default for Connect {
    fn default() -> Self {
        Self {
            protocol_version: ProtocolVersion::V5,
            client_id: String::new(),
            clean_start: true,
            keep_alive: 60,
            username: None,
            password: None,
            will: None,
            properties: Properties::default(),
        }
    }
}

/// The last-will message a CONNECT registers, published by the broker if
/// the connection drops without a clean DISCONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Will {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
    pub properties: Properties,
}

/// Server's reply to CONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnAck {
    pub session_present: bool,
    /// v5 reason code, or a v3.1.1 return code narrowed/widened via
    /// [`ReasonCode::to_v3_connack_code`]/[`ReasonCode::from_v3_connack_code`].
    pub reason_code: ReasonCode,
    pub properties: Properties,
}

impl Default for ConnAck {
    fn default() -> Self {
        Self {
            session_present: false,
            reason_code: ReasonCode::Success,
            properties: Properties::default(),
        }
    }
}

/// An application message, either inbound from a publisher or outbound to
/// a subscriber.
///
/// `topic` is `Arc<str>` rather than `String` because fan-out clones it
/// once per subscriber; with `Arc` that's a refcount bump instead of a
/// fresh heap allocation per recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
    pub topic: Arc<str>,
    /// `None` for QoS 0; QoS 1/2 always carry an identifier.
    pub packet_id: Option<u16>,
    pub payload: Bytes,
    pub properties: Properties,
}

impl Default for Publish {
    fn default() -> Self {
        Self {
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic: Arc::from(""),
            packet_id: None,
            payload: Bytes::new(),
            properties: Properties::default(),
        }
    }
}

/// Generates the four QoS handshake acknowledgment packets
/// (PUBACK/PUBREC/PUBREL/PUBCOMP), which are identical in shape — a packet
/// identifier plus a v5 reason code and properties — and differ only in
/// which step of the handshake they represent.
macro_rules! qos_ack_packet {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub packet_id: u16,
            pub reason_code: ReasonCode,
            pub properties: Properties,
        }

        impl $name {
            /// A success reply for `packet_id`, the common case; callers
            /// needing a non-default reason build the struct directly.
            pub fn new(packet_id: u16) -> Self {
                Self {
                    packet_id,
                    reason_code: ReasonCode::Success,
                    properties: Properties::default(),
                }
            }
        }
    };
}

qos_ack_packet!(PubAck, "Acknowledges a QoS 1 PUBLISH.");
qos_ack_packet!(PubRec, "QoS 2 handshake step 1: publisher -> broker received.");
qos_ack_packet!(PubRel, "QoS 2 handshake step 2: broker -> publisher may deliver.");
qos_ack_packet!(PubComp, "QoS 2 handshake step 3: publisher -> broker, delivery complete.");

/// One filter plus its requested options within a SUBSCRIBE packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub filter: String,
    pub options: SubscriptionOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub packet_id: u16,
    pub subscriptions: Vec<Subscription>,
    pub properties: Properties,
}

/// Server's reply to SUBSCRIBE: one reason code per requested filter, in
/// the same order the filters were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAck {
    pub packet_id: u16,
    pub reason_codes: Vec<ReasonCode>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    pub packet_id: u16,
    pub filters: Vec<String>,
    pub properties: Properties,
}

/// Server's reply to UNSUBSCRIBE. v3.1.1 UNSUBACK carries no payload beyond
/// the packet identifier; `reason_codes` is only populated for v5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubAck {
    pub packet_id: u16,
    pub reason_codes: Vec<ReasonCode>,
    pub properties: Properties,
}

/// Graceful connection teardown. v3.1.1 only ever sends this
/// client-to-server with no payload; v5 allows either direction and a
/// reason code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Disconnect {
    pub reason_code: ReasonCode,
    pub properties: Properties,
}

/// Enhanced authentication exchange packet, v5 only (SASL-style
/// challenge/response beyond the username/password in CONNECT).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Auth {
    pub reason_code: ReasonCode,
    pub properties: Properties,
}
