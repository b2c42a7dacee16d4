//! # Feed Events
//!
//! The typed form of every envelope that can arrive on the feed, and the
//! discriminator used to route it.

use netwatch_types::{InterfaceInfo, PacketInfo, RuleViolation};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

/// Wire value of the `type` field for interface lists.
pub const TYPE_INTERFACES: &str = "interfaces";
/// Wire value of the `type` field for packet updates.
pub const TYPE_PACKET_UPDATE: &str = "packet_update";
/// Wire value of the `type` field for rule violations.
pub const TYPE_RULE_VIOLATION: &str = "rule_violation";
/// Kind name used for messages that carry no type discriminator at all.
pub const TYPE_OPAQUE: &str = "opaque";

/// Routing key of an envelope, taken from its `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Interfaces,
    PacketUpdate,
    RuleViolation,
    /// Message without a usable `type` field (plain text, untagged JSON).
    Opaque,
    /// A `type` value this layer does not recognize.
    Other(String),
}

impl EventKind {
    /// Map a wire discriminator to its kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            TYPE_INTERFACES => Self::Interfaces,
            TYPE_PACKET_UPDATE => Self::PacketUpdate,
            TYPE_RULE_VIOLATION => Self::RuleViolation,
            TYPE_OPAQUE => Self::Opaque,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire discriminator for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Interfaces => TYPE_INTERFACES,
            Self::PacketUpdate => TYPE_PACKET_UPDATE,
            Self::RuleViolation => TYPE_RULE_VIOLATION,
            Self::Opaque => TYPE_OPAQUE,
            Self::Other(tag) => tag,
        }
    }

    /// Whether envelopes of this kind get a latest-value cache slot.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        matches!(
            self,
            Self::Interfaces | Self::PacketUpdate | Self::RuleViolation
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(tag: &str) -> Self {
        Self::from_tag(tag)
    }
}

impl From<String> for EventKind {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

/// Packet payload of a `packet_update` envelope.
///
/// Producers sometimes double-encode `packet_info` as a JSON string. When
/// that inner string does not decode, the raw text is kept instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PacketPayload {
    Decoded(PacketInfo),
    Raw(String),
}

impl PacketPayload {
    /// The decoded packet, if decoding succeeded.
    pub fn packet(&self) -> Option<&PacketInfo> {
        match self {
            Self::Decoded(packet) => Some(packet),
            Self::Raw(_) => None,
        }
    }
}

/// Body of an envelope this layer could not or did not type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OpaqueBody {
    /// Well-formed JSON, kept as-is.
    Json(Value),
    /// Anything that was not JSON.
    Text(String),
}

/// An envelope stored without a typed payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpaquePayload {
    /// The `type` discriminator, when the message had one.
    pub type_tag: Option<String>,
    pub body: OpaqueBody,
}

/// A decoded envelope.
///
/// One variant per recognized `type`, plus a catch-all for everything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum FeedEvent {
    Interfaces(Vec<InterfaceInfo>),
    PacketUpdate(PacketPayload),
    RuleViolation(RuleViolation),
    Opaque(OpaquePayload),
}

impl FeedEvent {
    /// Routing key for this event.
    ///
    /// Opaque payloads that still carry a `type` tag route by that tag, so a
    /// malformed `interfaces` message reaches `interfaces` subscribers.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Interfaces(_) => EventKind::Interfaces,
            Self::PacketUpdate(_) => EventKind::PacketUpdate,
            Self::RuleViolation(_) => EventKind::RuleViolation,
            Self::Opaque(OpaquePayload {
                type_tag: Some(tag),
                ..
            }) => EventKind::from_tag(tag),
            Self::Opaque(_) => EventKind::Opaque,
        }
    }

    /// Encode back into the wire envelope shape.
    ///
    /// Opaque events are reproduced as they arrived.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Interfaces(interfaces) => json!({
                "type": TYPE_INTERFACES,
                "interfaces": interfaces,
            }),
            Self::PacketUpdate(PacketPayload::Decoded(packet)) => json!({
                "type": TYPE_PACKET_UPDATE,
                "packet_info": packet,
            }),
            Self::PacketUpdate(PacketPayload::Raw(raw)) => json!({
                "type": TYPE_PACKET_UPDATE,
                "packet_info": raw,
            }),
            Self::RuleViolation(violation) => json!({
                "type": TYPE_RULE_VIOLATION,
                "rule_violation": violation,
            }),
            Self::Opaque(opaque) => match &opaque.body {
                OpaqueBody::Json(value) => value.clone(),
                OpaqueBody::Text(text) => Value::String(text.clone()),
            },
        }
    }

    /// Short human readable description, used in logs and the CLI.
    pub fn summary(&self) -> String {
        match self {
            Self::Interfaces(interfaces) => {
                let names: Vec<&str> = interfaces.iter().map(|i| i.name.as_str()).collect();
                format!("{} interface(s) [{}]", interfaces.len(), names.join(", "))
            }
            Self::PacketUpdate(PacketPayload::Decoded(packet)) => packet.summary(),
            Self::PacketUpdate(PacketPayload::Raw(raw)) => {
                format!("undecoded packet ({} bytes)", raw.len())
            }
            Self::RuleViolation(violation) => violation.summary(),
            Self::Opaque(opaque) => match &opaque.body {
                OpaqueBody::Json(value) => value.to_string(),
                OpaqueBody::Text(text) => text.clone(),
            },
        }
    }
}
