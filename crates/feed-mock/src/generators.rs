//! Random sample data shaped like the live capture feed.

use chrono::{SecondsFormat, Utc};
use netwatch_types::{AvgStats, FlexNumber, InterfaceInfo, PacketInfo, PcapStats, RuleViolation};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Instant;

pub const PROTOCOLS: [&str; 5] = ["TCP", "UDP", "ICMP", "HTTP", "HTTPS"];

/// Detection rules the mock can fire: (id, name, details).
pub const RULES: [(&str, &str, &str); 4] = [
    ("R001", "Port Scan", "Sequential connection attempts across many ports"),
    ("R002", "Oversized ICMP", "ICMP payload exceeds expected size"),
    ("R003", "Brute Force", "Repeated authentication failures from one source"),
    ("R004", "Suspicious Outbound", "Traffic to a destination on the watch list"),
];

pub fn random_ipv4<R: Rng>(rng: &mut R) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.gen::<u8>(),
        rng.gen::<u8>(),
        rng.gen::<u8>(),
        rng.gen::<u8>()
    )
}

/// Current time as an ISO-8601 string with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Interfaces announced to every new client.
pub fn sample_interfaces() -> Vec<InterfaceInfo> {
    vec![
        InterfaceInfo {
            description: Some("Loopback".to_string()),
            status: Some("up".to_string()),
            ..InterfaceInfo::new("1", "lo")
        },
        InterfaceInfo {
            description: Some("Primary Ethernet".to_string()),
            status: Some("up".to_string()),
            ..InterfaceInfo::new("2", "eth0")
        },
        InterfaceInfo {
            description: Some("Wireless".to_string()),
            status: Some("down".to_string()),
            ..InterfaceInfo::new("3", "wlan0")
        },
    ]
}

/// Simulated capture session.
///
/// Tracks cumulative capture counters so successive packets carry
/// monotonically growing `pcap_stats`, as a real capture loop reports them.
#[derive(Debug)]
pub struct CaptureSimulator {
    started: Instant,
    received: u64,
    dropped_kernel: u64,
    dropped_interface: u64,
    total_bytes: u64,
}

impl Default for CaptureSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSimulator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            received: 0,
            dropped_kernel: 0,
            dropped_interface: 0,
            total_bytes: 0,
        }
    }

    /// Produce the next packet.
    pub fn next_packet<R: Rng>(&mut self, rng: &mut R) -> PacketInfo {
        let length: u64 = rng.gen_range(0..1500);

        self.received += 1;
        self.total_bytes += length;
        if rng.gen_bool(0.05) {
            self.dropped_kernel += 1;
        }
        if rng.gen_bool(0.02) {
            self.dropped_interface += 1;
        }

        let elapsed = self.started.elapsed().as_secs_f64().max(1.0);
        let protocol = PROTOCOLS.choose(rng).copied().unwrap_or("TCP");

        PacketInfo {
            src_ip: random_ipv4(rng),
            dst_ip: random_ipv4(rng),
            src_port: FlexNumber::from(rng.gen_range(1024..=65535u64)),
            dst_port: FlexNumber::from(well_known_port(protocol)),
            protocol: protocol.to_string(),
            length: FlexNumber::from(length),
            timestamp: timestamp(),
            pcap_stats: Some(PcapStats {
                received: self.received,
                dropped_kernel: self.dropped_kernel,
                dropped_interface: self.dropped_interface,
            }),
            avg_stats: Some(AvgStats {
                avg_packet_size: self.total_bytes as f64 / self.received as f64,
                packets_per_second: self.received as f64 / elapsed,
            }),
            ..PacketInfo::default()
        }
    }
}

fn well_known_port(protocol: &str) -> u64 {
    match protocol {
        "HTTP" => 80,
        "HTTPS" => 443,
        "UDP" => 53,
        "ICMP" => 0,
        _ => 22,
    }
}

pub fn generate_violation<R: Rng>(rng: &mut R) -> RuleViolation {
    let (rule_id, rule_name, details) = RULES.choose(rng).copied().unwrap_or(RULES[0]);

    RuleViolation {
        rule_id: rule_id.to_string(),
        rule_name: rule_name.to_string(),
        src_ip: random_ipv4(rng),
        dst_ip: random_ipv4(rng),
        timestamp: timestamp(),
        packet_size: FlexNumber::from(rng.gen_range(0..1500u64)),
        details: details.to_string(),
        ..RuleViolation::default()
    }
}

// =============================================================================
// ENVELOPES
// =============================================================================

pub fn interfaces_envelope(interfaces: &[InterfaceInfo]) -> Value {
    json!({ "type": "interfaces", "interfaces": interfaces })
}

/// `packet_update` envelope. With `nested` set, `packet_info` is itself a
/// JSON-encoded string, which the capture backend sometimes emits.
pub fn packet_envelope(packet: &PacketInfo, nested: bool) -> Value {
    let packet_info = if nested {
        Value::String(json!(packet).to_string())
    } else {
        json!(packet)
    };
    json!({ "type": "packet_update", "packet_info": packet_info })
}

pub fn violation_envelope(violation: &RuleViolation) -> Value {
    json!({ "type": "rule_violation", "rule_violation": violation })
}
