//! Error types produced while turning bytes into packets and back.
//!
//! [`DecodeError`] and [`EncodeError`] describe what went wrong at the byte
//! level; [`ProtocolError`] is the umbrella type connection handling actually
//! propagates, folding in the malformed-input cases plus the broker-level
//! conditions (auth failure, quota, keep-alive timeout) that also end a
//! connection but never touch the codec.

use std::fmt;

/// Something about the byte stream didn't parse as a valid MQTT packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer doesn't yet hold a complete packet; the caller should wait
    /// for more bytes rather than treat this as malformed input.
    InsufficientData,
    /// Fixed header byte named a packet type MQTT doesn't define.
    InvalidPacketType(u8),
    /// Remaining-length varint didn't terminate within four bytes.
    InvalidRemainingLength,
    /// Remaining-length varint decoded past the protocol's 256 MB ceiling.
    RemainingLengthTooLarge,
    /// CONNECT's protocol name field wasn't "MQTT" (or "MQIsdp" for v3.1).
    InvalidProtocolName,
    /// CONNECT named a protocol level byte this decoder doesn't support.
    InvalidProtocolVersion(u8),
    /// QoS field carried a value other than 0, 1, or 2.
    InvalidQoS(u8),
    /// A length-prefixed string field wasn't valid UTF-8.
    InvalidUtf8,
    /// A string exceeded the 65535-byte length a u16 prefix can encode.
    StringTooLong,
    /// v5 properties block referenced an identifier outside the defined set.
    InvalidPropertyId(u8),
    /// v5 properties block repeated an identifier that MQTT says must appear
    /// at most once.
    DuplicateProperty(u8),
    /// Fixed header flag bits didn't match what the packet type requires.
    InvalidFlags,
    /// Catch-all for structural violations too specific to warrant their own
    /// variant; the string names what was wrong.
    MalformedPacket(&'static str),
    /// Decoded remaining length exceeds the configured maximum packet size.
    PacketTooLarge,
    /// A v5 reason code byte didn't map to any defined `ReasonCode`.
    InvalidReasonCode(u8),
    /// SUBSCRIBE options byte set reserved bits or an invalid retain-handling
    /// value.
    InvalidSubscriptionOptions,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData => f.write_str("buffer does not yet contain a full packet"),
            Self::InvalidPacketType(t) => write!(f, "unrecognized packet type byte 0x{:02x}", t),
            Self::InvalidRemainingLength => f.write_str("remaining length varint did not terminate"),
            Self::RemainingLengthTooLarge => {
                f.write_str("remaining length exceeds the 256MB protocol maximum")
            }
            Self::InvalidProtocolName => f.write_str("CONNECT protocol name was not MQTT"),
            Self::InvalidProtocolVersion(v) => write!(f, "unsupported protocol level {}", v),
            Self::InvalidQoS(q) => write!(f, "QoS byte {} is not 0, 1, or 2", q),
            Self::InvalidUtf8 => f.write_str("string field was not valid UTF-8"),
            Self::StringTooLong => f.write_str("string exceeds the 65535 byte length limit"),
            Self::InvalidPropertyId(id) => write!(f, "unknown property identifier {}", id),
            Self::DuplicateProperty(id) => write!(f, "property {} appeared more than once", id),
            Self::InvalidFlags => f.write_str("fixed header flags do not match the packet type"),
            Self::MalformedPacket(reason) => write!(f, "malformed packet: {}", reason),
            Self::PacketTooLarge => f.write_str("packet exceeds the configured size limit"),
            Self::InvalidReasonCode(code) => write!(f, "reason code {} is not defined", code),
            Self::InvalidSubscriptionOptions => {
                f.write_str("subscription options byte is invalid")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A packet's in-memory representation couldn't be serialized as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Caller-supplied output buffer has no room for the encoded packet.
    BufferTooSmall,
    /// Encoded size would exceed the protocol's remaining-length ceiling.
    PacketTooLarge,
    /// A string field is longer than a u16 length prefix can represent.
    StringTooLong,
    /// Topic name failed validation (empty, or contains wildcard characters
    /// where a literal topic is required).
    InvalidTopicName,
    /// SUBSCRIBE/UNSUBSCRIBE carried more filters than fit in one packet.
    TooManySubscriptions,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("output buffer has insufficient capacity"),
            Self::PacketTooLarge => f.write_str("encoded packet exceeds the size limit"),
            Self::StringTooLong => f.write_str("string exceeds the 65535 byte length limit"),
            Self::InvalidTopicName => f.write_str("topic name is empty or contains wildcards"),
            Self::TooManySubscriptions => f.write_str("too many filters for a single packet"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Errors surfaced to connection handling, above the codec layer.
///
/// Wraps [`DecodeError`]/[`EncodeError`] alongside the broker-level
/// conditions that also terminate a connection but never touch wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A packet failed to parse; see the wrapped [`DecodeError`].
    Decode(DecodeError),
    /// A packet failed to serialize; see the wrapped [`EncodeError`].
    Encode(EncodeError),
    /// CONNECT was rejected; the byte is the CONNACK return code to send
    /// before closing the socket.
    ConnectionRefused(u8),
    /// Client behavior violated an MQTT requirement outside of the byte
    /// encoding itself (ordering, duplicate CONNECT, and similar).
    ProtocolViolation(&'static str),
    /// Session expiry interval elapsed before the client reconnected.
    SessionExpired,
    /// Action was rejected by the auth/ACL layer.
    NotAuthorized,
    /// A configured resource limit (connections, subscriptions, rate) was
    /// exceeded.
    QuotaExceeded,
    /// No packet arrived within 1.5x the negotiated keep-alive interval.
    KeepAliveTimeout,
    /// Server-side failure unrelated to client input.
    ImplementationError(&'static str),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(inner) => write!(f, "decode failed: {}", inner),
            Self::Encode(inner) => write!(f, "encode failed: {}", inner),
            Self::ConnectionRefused(code) => write!(f, "connection refused, code {}", code),
            Self::ProtocolViolation(reason) => write!(f, "protocol violation: {}", reason),
            Self::SessionExpired => f.write_str("session expiry interval elapsed"),
            Self::NotAuthorized => f.write_str("not authorized"),
            Self::QuotaExceeded => f.write_str("resource quota exceeded"),
            Self::KeepAliveTimeout => f.write_str("keep-alive interval exceeded"),
            Self::ImplementationError(reason) => write!(f, "internal error: {}", reason),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<DecodeError> for ProtocolError {
    fn from(err: DecodeError) -> Self {
        ProtocolError::Decode(err)
    }
}

impl From<EncodeError> for ProtocolError {
    fn from(err: EncodeError) -> Self {
        ProtocolError::Encode(err)
    }
}
