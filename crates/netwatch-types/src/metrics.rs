//! # Packet Metrics
//!
//! Summary figures derived from the capture statistics carried by each
//! packet update. Dashboards render these instead of the raw counters.

use crate::entities::PacketInfo;
use serde::{Deserialize, Serialize};

/// Derived metrics for the most recent packet update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketMetrics {
    /// Packets per second, rounded to two decimals.
    pub packet_rate: f64,
    /// Mean packet size in bytes, rounded to two decimals.
    pub avg_size: f64,
    /// Packets received by the capture handle.
    pub total_packets: u64,
    pub dropped_kernel: u64,
    pub dropped_interface: u64,
    /// Wall-clock time the metrics were derived, in Unix milliseconds.
    pub timestamp_ms: u64,
}

impl PacketMetrics {
    /// Derive metrics from a packet. Missing statistics count as zero.
    #[must_use]
    pub fn from_packet(packet: &PacketInfo, timestamp_ms: u64) -> Self {
        let pcap = packet.pcap_stats.unwrap_or_default();
        let avg = packet.avg_stats.unwrap_or_default();

        Self {
            packet_rate: round2(avg.packets_per_second),
            avg_size: round2(avg.avg_packet_size),
            total_packets: pcap.received,
            dropped_kernel: pcap.dropped_kernel,
            dropped_interface: pcap.dropped_interface,
            timestamp_ms,
        }
    }

    /// Packets dropped by the kernel and the interface combined.
    #[must_use]
    pub fn total_dropped(&self) -> u64 {
        self.dropped_kernel.saturating_add(self.dropped_interface)
    }

    /// Fraction of seen packets that were dropped, in `[0, 1]`.
    #[must_use]
    pub fn drop_ratio(&self) -> f64 {
        let seen = self.total_packets.saturating_add(self.total_dropped());
        if seen == 0 {
            0.0
        } else {
            self.total_dropped() as f64 / seen as f64
        }
    }
}

fn round2(value: f64) -> f64 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AvgStats, PcapStats};
    use proptest::prelude::*;

    fn packet_with(pcap: Option<PcapStats>, avg: Option<AvgStats>) -> PacketInfo {
        PacketInfo {
            pcap_stats: pcap,
            avg_stats: avg,
            ..PacketInfo::default()
        }
    }

    #[test]
    fn test_total_dropped() {
        let packet = packet_with(
            Some(PcapStats {
                received: 100,
                dropped_kernel: 2,
                dropped_interface: 1,
            }),
            None,
        );

        let metrics = PacketMetrics::from_packet(&packet, 42);
        assert_eq!(metrics.total_dropped(), 3);
        assert_eq!(metrics.total_packets, 100);
        assert_eq!(metrics.timestamp_ms, 42);
    }

    #[test]
    fn test_missing_stats_are_zero() {
        let metrics = PacketMetrics::from_packet(&PacketInfo::default(), 0);
        assert_eq!(metrics.packet_rate, 0.0);
        assert_eq!(metrics.avg_size, 0.0);
        assert_eq!(metrics.total_dropped(), 0);
        assert_eq!(metrics.drop_ratio(), 0.0);
    }

    #[test]
    fn test_averages_rounded() {
        let packet = packet_with(
            None,
            Some(AvgStats {
                avg_packet_size: 512.3456,
                packets_per_second: 12.3449,
            }),
        );

        let metrics = PacketMetrics::from_packet(&packet, 0);
        assert_eq!(metrics.avg_size, 512.35);
        assert_eq!(metrics.packet_rate, 12.34);
    }

    #[test]
    fn test_non_finite_average() {
        let packet = packet_with(
            None,
            Some(AvgStats {
                avg_packet_size: f64::NAN,
                packets_per_second: f64::INFINITY,
            }),
        );

        let metrics = PacketMetrics::from_packet(&packet, 0);
        assert_eq!(metrics.avg_size, 0.0);
        assert_eq!(metrics.packet_rate, 0.0);
    }

    proptest! {
        #[test]
        fn prop_drop_ratio_bounded(received in 0u64..1_000_000, kernel in 0u64..1_000_000, iface in 0u64..1_000_000) {
            let packet = packet_with(
                Some(PcapStats { received, dropped_kernel: kernel, dropped_interface: iface }),
                None,
            );
            let ratio = PacketMetrics::from_packet(&packet, 0).drop_ratio();
            prop_assert!((0.0..=1.0).contains(&ratio));
        }
    }
}
