//! # Envelope Decoding
//!
//! Turns raw inbound frames into [`FeedEvent`]s.
//!
//! Decoding never fails outright. A frame that cannot be typed is wrapped as
//! [`FeedEvent::Opaque`] (or [`PacketPayload::Raw`] for a bad nested packet)
//! and the reason is returned next to it.

use crate::errors::DecodeError;
use crate::events::{EventKind, FeedEvent, OpaqueBody, OpaquePayload, PacketPayload};
use netwatch_types::{InterfaceInfo, PacketInfo, RuleViolation};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A frame as it arrived on the inbound channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    Text(String),
    Binary(Vec<u8>),
    /// Already-structured data from an in-process producer.
    Json(Value),
}

impl From<&str> for RawMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RawMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for RawMessage {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub event: FeedEvent,
    /// Present when the event was degraded.
    pub error: Option<DecodeError>,
}

impl Decoded {
    fn clean(event: FeedEvent) -> Self {
        Self { event, error: None }
    }

    fn degraded(event: FeedEvent, error: DecodeError) -> Self {
        Self {
            event,
            error: Some(error),
        }
    }
}

/// Decode a raw frame.
pub fn decode(raw: RawMessage) -> Decoded {
    match raw {
        RawMessage::Json(value) => decode_value(value),
        RawMessage::Text(text) => decode_text(text),
        RawMessage::Binary(bytes) => match String::from_utf8(bytes) {
            Ok(text) => decode_text(text),
            Err(e) => {
                let lossy = String::from_utf8_lossy(e.as_bytes()).into_owned();
                Decoded::degraded(opaque_text(lossy), DecodeError::InvalidUtf8)
            }
        },
    }
}

fn decode_text(text: String) -> Decoded {
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => decode_value(value),
        Err(e) => Decoded::degraded(opaque_text(text), DecodeError::InvalidJson(e.to_string())),
    }
}

/// Route a structured message by its `type` discriminator.
pub fn decode_value(value: Value) -> Decoded {
    let Some(tag) = value.get("type").and_then(Value::as_str) else {
        return Decoded::clean(FeedEvent::Opaque(OpaquePayload {
            type_tag: None,
            body: OpaqueBody::Json(value),
        }));
    };

    let kind = EventKind::from_tag(tag);
    match kind {
        EventKind::Interfaces => match typed_field::<Vec<InterfaceInfo>>(&value, "interfaces") {
            Ok(interfaces) => Decoded::clean(FeedEvent::Interfaces(interfaces)),
            Err(reason) => degrade(kind, value, reason),
        },
        EventKind::PacketUpdate => decode_packet(value),
        EventKind::RuleViolation => match typed_field::<RuleViolation>(&value, "rule_violation") {
            Ok(violation) => Decoded::clean(FeedEvent::RuleViolation(violation)),
            Err(reason) => degrade(kind, value, reason),
        },
        EventKind::Opaque | EventKind::Other(_) => {
            let type_tag = Some(kind.as_str().to_string());
            Decoded::clean(FeedEvent::Opaque(OpaquePayload {
                type_tag,
                body: OpaqueBody::Json(value),
            }))
        }
    }
}

fn decode_packet(value: Value) -> Decoded {
    match value.get("packet_info") {
        // Double-encoded: decode the inner string, keep it raw on failure
        Some(Value::String(inner)) => match serde_json::from_str::<PacketInfo>(inner) {
            Ok(packet) => Decoded::clean(FeedEvent::PacketUpdate(PacketPayload::Decoded(packet))),
            Err(e) => Decoded::degraded(
                FeedEvent::PacketUpdate(PacketPayload::Raw(inner.clone())),
                DecodeError::NestedPacket(e.to_string()),
            ),
        },
        _ => match typed_field::<PacketInfo>(&value, "packet_info") {
            Ok(packet) => Decoded::clean(FeedEvent::PacketUpdate(PacketPayload::Decoded(packet))),
            Err(reason) => degrade(EventKind::PacketUpdate, value, reason),
        },
    }
}

/// Deserialize `value[field]`; a missing or null field yields the default.
fn typed_field<T>(value: &Value, field: &str) -> Result<T, String>
where
    T: DeserializeOwned + Default,
{
    match value.get(field) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(inner) => T::deserialize(inner).map_err(|e| e.to_string()),
    }
}

fn degrade(kind: EventKind, value: Value, reason: String) -> Decoded {
    let type_tag = Some(kind.as_str().to_string());
    Decoded::degraded(
        FeedEvent::Opaque(OpaquePayload {
            type_tag,
            body: OpaqueBody::Json(value),
        }),
        DecodeError::InvalidPayload { kind, reason },
    )
}

fn opaque_text(text: String) -> FeedEvent {
    FeedEvent::Opaque(OpaquePayload {
        type_tag: None,
        body: OpaqueBody::Text(text),
    })
}
