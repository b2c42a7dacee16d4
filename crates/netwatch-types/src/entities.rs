//! # Feed Entities
//!
//! Records published on the feed, one struct per recognized envelope type.

use crate::lenient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Fields not modelled explicitly, preserved verbatim.
pub type ExtraFields = Map<String, Value>;

// =============================================================================
// FLEXIBLE SCALARS
// =============================================================================

/// A numeric field that producers send either as a JSON number or a string.
///
/// Ports, lengths and sizes are all observed in both forms on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlexNumber {
    /// Sent as a JSON number.
    Number(Number),
    /// Sent as a string, e.g. `"443"`.
    Text(String),
}

impl FlexNumber {
    /// Interpret the value as an unsigned integer, if it is one.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Interpret the value as a float, if it is numeric at all.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Default for FlexNumber {
    fn default() -> Self {
        Self::Number(Number::from(0u64))
    }
}

impl From<u64> for FlexNumber {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<&str> for FlexNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for FlexNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// INTERFACES
// =============================================================================

/// A capture interface advertised by the feed (`interfaces` envelope).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Interface identifier, unique within one `interfaces` list.
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    /// OS-level interface name, e.g. `eth0`.
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Link status as reported by the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl InterfaceInfo {
    /// Create an interface descriptor with just an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// PACKETS
// =============================================================================

/// Capture statistics attached to a packet update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcapStats {
    /// Packets received by the capture handle.
    #[serde(deserialize_with = "lenient::counter")]
    pub received: u64,
    /// Packets dropped by the kernel.
    #[serde(deserialize_with = "lenient::counter")]
    pub dropped_kernel: u64,
    /// Packets dropped by the interface driver.
    #[serde(deserialize_with = "lenient::counter")]
    pub dropped_interface: u64,
}

impl PcapStats {
    /// Total packets lost before reaching the capture handle.
    #[must_use]
    pub fn total_dropped(&self) -> u64 {
        self.dropped_kernel.saturating_add(self.dropped_interface)
    }
}

/// Rolling averages attached to a packet update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvgStats {
    /// Mean packet size in bytes.
    #[serde(deserialize_with = "lenient::float")]
    pub avg_packet_size: f64,
    /// Packets per second over the producer's window.
    #[serde(deserialize_with = "lenient::float")]
    pub packets_per_second: f64,
}

/// A single captured packet (`packet_update` envelope).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketInfo {
    #[serde(deserialize_with = "lenient::text")]
    pub src_ip: String,
    #[serde(deserialize_with = "lenient::text")]
    pub dst_ip: String,
    #[serde(deserialize_with = "lenient::flex_number")]
    pub src_port: FlexNumber,
    #[serde(deserialize_with = "lenient::flex_number")]
    pub dst_port: FlexNumber,
    #[serde(deserialize_with = "lenient::text")]
    pub protocol: String,
    #[serde(deserialize_with = "lenient::flex_number")]
    pub length: FlexNumber,
    /// ISO-8601 text or epoch milliseconds, kept as sent.
    #[serde(deserialize_with = "lenient::text")]
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcap_stats: Option<PcapStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_stats: Option<AvgStats>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl PacketInfo {
    /// One-line `src:port -> dst:port (proto)` summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}:{} -> {}:{} ({}) len={}",
            self.src_ip, self.src_port, self.dst_ip, self.dst_port, self.protocol, self.length
        )
    }
}

// =============================================================================
// RULE VIOLATIONS
// =============================================================================

/// A detection rule firing on observed traffic (`rule_violation` envelope).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleViolation {
    #[serde(deserialize_with = "lenient::text")]
    pub rule_id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub rule_name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub src_ip: String,
    #[serde(deserialize_with = "lenient::text")]
    pub dst_ip: String,
    #[serde(deserialize_with = "lenient::text")]
    pub timestamp: String,
    #[serde(deserialize_with = "lenient::flex_number")]
    pub packet_size: FlexNumber,
    #[serde(deserialize_with = "lenient::text")]
    pub details: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl RuleViolation {
    /// One-line summary used by log output and the CLI.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) {} -> {}",
            self.rule_name, self.rule_id, self.src_ip, self.dst_ip
        )
    }
}
