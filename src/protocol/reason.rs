//! v5.0 reason codes.
//!
//! v3.1.1 only has the four-value CONNACK return code and otherwise no
//! notion of "why" an operation failed; [`ReasonCode::to_v3_connack_code`]
//! and [`ReasonCode::from_v3_connack_code`] are the bridge the codec uses so
//! connection handling can work in `ReasonCode` regardless of which
//! protocol version is live on the wire.

use std::fmt;

/// A v5.0 reason code, carried on CONNACK, PUBACK/PUBREC/PUBREL/PUBCOMP,
/// SUBACK/UNSUBACK, and DISCONNECT. The discriminant is the wire byte —
/// encoding is a direct `as u8` cast, so values must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReasonCode {
    #[default]
    Success = 0x00,
    GrantedQoS1 = 0x01,
    GrantedQoS2 = 0x02,
    DisconnectWithWill = 0x04,
    NoMatchingSubscribers = 0x10,
    NoSubscriptionExisted = 0x11,
    ContinueAuthentication = 0x18,
    ReAuthenticate = 0x19,
    UnspecifiedError = 0x80,
    MalformedPacket = 0x81,
    ProtocolError = 0x82,
    ImplementationError = 0x83,
    UnsupportedProtocolVersion = 0x84,
    ClientIdNotValid = 0x85,
    BadUserNameOrPassword = 0x86,
    NotAuthorized = 0x87,
    ServerUnavailable = 0x88,
    ServerBusy = 0x89,
    Banned = 0x8A,
    ServerShuttingDown = 0x8B,
    BadAuthenticationMethod = 0x8C,
    KeepAliveTimeout = 0x8D,
    SessionTakenOver = 0x8E,
    TopicFilterInvalid = 0x8F,
    TopicNameInvalid = 0x90,
    PacketIdInUse = 0x91,
    PacketIdNotFound = 0x92,
    ReceiveMaxExceeded = 0x93,
    TopicAliasInvalid = 0x94,
    PacketTooLarge = 0x95,
    MessageRateTooHigh = 0x96,
    QuotaExceeded = 0x97,
    AdministrativeAction = 0x98,
    PayloadFormatInvalid = 0x99,
    RetainNotSupported = 0x9A,
    QoSNotSupported = 0x9B,
    UseAnotherServer = 0x9C,
    ServerMoved = 0x9D,
    SharedSubsNotSupported = 0x9E,
    ConnectionRateExceeded = 0x9F,
    MaximumConnectTime = 0xA0,
    SubIdNotSupported = 0xA1,
    WildcardSubsNotSupported = 0xA2,
}

/// Every defined reason code paired with its display text, used to drive
/// [`ReasonCode::from_u8`] and [`fmt::Display`] from one table instead of
/// duplicating the variant list in two separate match expressions.
const TABLE: &[(ReasonCode, &str)] = &[
    (ReasonCode::Success, "Success"),
    (ReasonCode::GrantedQoS1, "Granted QoS 1"),
    (ReasonCode::GrantedQoS2, "Granted QoS 2"),
    (ReasonCode::DisconnectWithWill, "Disconnect with Will Message"),
    (ReasonCode::NoMatchingSubscribers, "No matching subscribers"),
    (ReasonCode::NoSubscriptionExisted, "No subscription existed"),
    (ReasonCode::ContinueAuthentication, "Continue authentication"),
    (ReasonCode::ReAuthenticate, "Re-authenticate"),
    (ReasonCode::UnspecifiedError, "Unspecified error"),
    (ReasonCode::MalformedPacket, "Malformed packet"),
    (ReasonCode::ProtocolError, "Protocol error"),
    (ReasonCode::ImplementationError, "Implementation specific error"),
    (ReasonCode::UnsupportedProtocolVersion, "Unsupported protocol version"),
    (ReasonCode::ClientIdNotValid, "Client identifier not valid"),
    (ReasonCode::BadUserNameOrPassword, "Bad user name or password"),
    (ReasonCode::NotAuthorized, "Not authorized"),
    (ReasonCode::ServerUnavailable, "Server unavailable"),
    (ReasonCode::ServerBusy, "Server busy"),
    (ReasonCode::Banned, "Banned"),
    (ReasonCode::ServerShuttingDown, "Server shutting down"),
    (ReasonCode::BadAuthenticationMethod, "Bad authentication method"),
    (ReasonCode::KeepAliveTimeout, "Keep alive timeout"),
    (ReasonCode::SessionTakenOver, "Session taken over"),
    (ReasonCode::TopicFilterInvalid, "Topic filter invalid"),
    (ReasonCode::TopicNameInvalid, "Topic name invalid"),
    (ReasonCode::PacketIdInUse, "Packet identifier in use"),
    (ReasonCode::PacketIdNotFound, "Packet identifier not found"),
    (ReasonCode::ReceiveMaxExceeded, "Receive maximum exceeded"),
    (ReasonCode::TopicAliasInvalid, "Topic alias invalid"),
    (ReasonCode::PacketTooLarge, "Packet too large"),
    (ReasonCode::MessageRateTooHigh, "Message rate too high"),
    (ReasonCode::QuotaExceeded, "Quota exceeded"),
    (ReasonCode::AdministrativeAction, "Administrative action"),
    (ReasonCode::PayloadFormatInvalid, "Payload format invalid"),
    (ReasonCode::RetainNotSupported, "Retain not supported"),
    (ReasonCode::QoSNotSupported, "QoS not supported"),
    (ReasonCode::UseAnotherServer, "Use another server"),
    (ReasonCode::ServerMoved, "Server moved"),
    (ReasonCode::SharedSubsNotSupported, "Shared subscriptions not supported"),
    (ReasonCode::ConnectionRateExceeded, "Connection rate exceeded"),
    (ReasonCode::MaximumConnectTime, "Maximum connect time"),
    (ReasonCode::SubIdNotSupported, "Subscription identifiers not supported"),
    (ReasonCode::WildcardSubsNotSupported, "Wildcard subscriptions not supported"),
];

impl ReasonCode {
    /// Looks up the reason code for a wire byte; `None` if it isn't one of
    /// the defined values.
    pub fn from_u8(byte: u8) -> Option<Self> {
        TABLE
            .iter()
            .find(|(code, _)| *code as u8 == byte)
            .map(|(code, _)| *code)
    }

    /// `true` for codes below 0x80 — MQTT reserves that range for success
    /// and "succeeded with a caveat" outcomes (granted a lower QoS, etc.).
    #[inline]
    pub fn is_success(self) -> bool {
        (self as u8) < 0x80
    }

    #[inline]
    pub fn is_error(self) -> bool {
        !self.is_success()
    }

    /// Narrows a v5 reason down to the four-value v3.1.1 CONNACK return
    /// code space. Codes v3.1.1 has no equivalent for collapse to
    /// `NotAuthorized` (0x05), the closest it gets to "rejected, details
    /// elsewhere".
    pub fn to_v3_connack_code(self) -> u8 {
        match self {
            ReasonCode::Success => 0x00,
            ReasonCode::UnsupportedProtocolVersion => 0x01,
            ReasonCode::ClientIdNotValid => 0x02,
            ReasonCode::ServerUnavailable => 0x03,
            ReasonCode::BadUserNameOrPassword => 0x04,
            ReasonCode::NotAuthorized => 0x05,
            _ => 0x05,
        }
    }

    /// Widens a v3.1.1 CONNACK return code into the corresponding v5
    /// reason code. Values outside 0x00-0x05 aren't legal v3.1.1 return
    /// codes, but this maps them to `UnspecifiedError` rather than
    /// panicking.
    pub fn from_v3_connack_code(code: u8) -> Self {
        match code {
            0x00 => ReasonCode::Success,
            0x01 => ReasonCode::UnsupportedProtocolVersion,
            0x02 => ReasonCode::ClientIdNotValid,
            0x03 => ReasonCode::ServerUnavailable,
            0x04 => ReasonCode::BadUserNameOrPassword,
            0x05 => ReasonCode::NotAuthorized,
            _ => ReasonCode::UnspecifiedError,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = TABLE
            .iter()
            .find(|(code, _)| code == self)
            .map(|(_, text)| *text)
            .unwrap_or("Unknown reason code");
        f.write_str(text)
    }
}
