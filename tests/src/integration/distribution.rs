//! # Distribution Flows
//!
//! Several independent consumers attached to one hub, the way dashboard
//! panels share a single feed:
//!
//! 1. **Interfaces panel**: attaches late, renders from `latest` first
//! 2. **Packet panel**: subscribes to `packet_update`, reads derived metrics
//! 3. **Alerts panel**: subscribes to `rule_violation`, keeps history
//! 4. **Raw log panel**: `subscribe_all` plus the message log

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use feed_bus::{EventKind, FeedEvent, FeedHub, HandlerError, PacketPayload, RawMessage};
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio_stream::StreamExt;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn interfaces(names: &[&str]) -> RawMessage {
        let list: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"id": (i + 1).to_string(), "name": name}))
            .collect();
        json!({"type": "interfaces", "interfaces": list}).into()
    }

    fn packet(received: u64, dropped_kernel: u64, dropped_interface: u64) -> RawMessage {
        json!({
            "type": "packet_update",
            "packet_info": {
                "src_ip": "10.0.0.1",
                "dst_ip": "10.0.0.2",
                "src_port": 51000,
                "dst_port": "443",
                "protocol": "HTTPS",
                "length": 512,
                "pcap_stats": {
                    "received": received,
                    "dropped_kernel": dropped_kernel,
                    "dropped_interface": dropped_interface
                },
                "avg_stats": {"avg_packet_size": 512.0, "packets_per_second": 42.125}
            }
        })
        .into()
    }

    fn violation(rule_id: &str) -> RawMessage {
        json!({
            "type": "rule_violation",
            "rule_violation": {"rule_id": rule_id, "rule_name": "Port Scan", "src_ip": "1.2.3.4"}
        })
        .into()
    }

    /// Callback recording the kind of every event it sees into `sink`.
    fn kind_recorder(
        sink: &Arc<Mutex<Vec<String>>>,
        label: &'static str,
    ) -> impl Fn(&FeedEvent) -> Result<(), HandlerError> + Send + Sync + 'static {
        let sink = Arc::clone(sink);
        move |event| {
            sink.lock().push(format!("{label}:{}", event.kind()));
            Ok(())
        }
    }

    // =============================================================================
    // MULTI-CONSUMER FLOWS
    // =============================================================================

    #[test]
    fn test_panels_share_one_feed() {
        let hub = FeedHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _packets = hub.subscribe(EventKind::PacketUpdate, kind_recorder(&seen, "packets"));
        let _alerts = hub.subscribe(EventKind::RuleViolation, kind_recorder(&seen, "alerts"));
        let _raw = hub.subscribe_all(kind_recorder(&seen, "raw"));

        hub.on_envelope(interfaces(&["eth0"]));
        hub.on_envelope(packet(100, 2, 1));
        hub.on_envelope(violation("R1"));

        assert_eq!(
            *seen.lock(),
            vec![
                "raw:interfaces",
                "packets:packet_update",
                "raw:packet_update",
                "alerts:rule_violation",
                "raw:rule_violation",
            ]
        );
        assert_eq!(hub.message_count(), 3);
    }

    #[test]
    fn test_late_panel_renders_from_latest() {
        let hub = FeedHub::new();
        hub.on_envelope(interfaces(&["eth0", "wlan0"]));
        hub.on_envelope(packet(10, 0, 0));

        // Panel mounts after the data arrived.
        let names: Vec<String> = hub
            .latest_interfaces()
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["eth0", "wlan0"]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = hub.subscribe(EventKind::Interfaces, kind_recorder(&seen, "ifaces"));
        assert!(seen.lock().is_empty());

        hub.on_envelope(interfaces(&[]));
        assert_eq!(hub.latest_interfaces(), Some(vec![]));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_packet_panel_metrics() {
        let hub = FeedHub::new();
        hub.on_envelope(packet(1000, 2, 1));

        let metrics = hub.packet_metrics().unwrap();
        assert_eq!(metrics.total_dropped(), 3);
        assert_eq!(metrics.total_packets, 1000);
        assert_eq!(metrics.packet_rate, 42.13);
        assert!(matches!(
            hub.latest_packet(),
            Some(PacketPayload::Decoded(p)) if p.dst_port.as_u64() == Some(443)
        ));
    }

    #[test]
    fn test_alerts_panel_history() {
        let hub = FeedHub::new();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let _a = hub.subscribe(EventKind::RuleViolation, kind_recorder(&first, "a"));
        let _b = hub.subscribe(EventKind::RuleViolation, kind_recorder(&second, "b"));

        hub.on_envelope(violation("R1"));
        hub.on_envelope(packet(1, 0, 0));
        hub.on_envelope(violation("R2"));

        assert_eq!(first.lock().len(), 2);
        assert_eq!(second.lock().len(), 2);

        let ids: Vec<String> = hub.rule_violations().into_iter().map(|v| v.rule_id).collect();
        assert_eq!(ids, vec!["R1", "R2"]);
        assert_eq!(hub.latest_violation().unwrap().rule_id, "R2");
    }

    #[test]
    fn test_raw_log_clear_does_not_disturb_panels() {
        let hub = FeedHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = hub.subscribe(EventKind::Interfaces, kind_recorder(&seen, "ifaces"));

        hub.on_envelope(interfaces(&["eth0"]));
        hub.clear_messages();

        assert_eq!(hub.message_count(), 0);
        assert!(hub.latest_interfaces().is_some());

        hub.on_envelope(interfaces(&["eth1"]));
        assert_eq!(hub.message_count(), 1);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_broken_panel_isolated() {
        let hub = FeedHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _broken = hub.subscribe(EventKind::PacketUpdate, |_: &FeedEvent| -> Result<(), HandlerError> {
            panic!("render failed")
        });
        let _failing = hub.subscribe(EventKind::PacketUpdate, |_: &FeedEvent| {
            Err(HandlerError::from("chart not mounted"))
        });
        let _healthy = hub.subscribe(EventKind::PacketUpdate, kind_recorder(&seen, "ok"));

        let report = hub.on_envelope(packet(5, 0, 0));

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(*seen.lock(), vec!["ok:packet_update"]);

        // The next envelope is unaffected.
        let next = hub.on_envelope(packet(6, 0, 0));
        assert_eq!(next.delivered, 1);
    }

    #[test]
    fn test_unknown_type_reaches_exact_and_all_only() {
        let hub = FeedHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _exact = hub.subscribe("capture_status", kind_recorder(&seen, "exact"));
        let _other = hub.subscribe(EventKind::Interfaces, kind_recorder(&seen, "ifaces"));
        let _all = hub.subscribe_all(kind_recorder(&seen, "all"));

        let report = hub.on_envelope(json!({"type": "capture_status", "running": true}).into());

        assert!(!report.cached);
        assert_eq!(
            *seen.lock(),
            vec!["exact:capture_status", "all:capture_status"]
        );
        assert!(hub.latest(&EventKind::from_tag("capture_status")).is_none());
    }

    #[test]
    fn test_malformed_frame_then_recovery() {
        let hub = FeedHub::new();

        let bad = hub.on_envelope(RawMessage::Text("{not json".to_string()));
        assert!(bad.decode_error.is_some());

        let good = hub.on_envelope(violation("R9"));
        assert!(good.is_clean());
        assert_eq!(hub.latest_violation().unwrap().rule_id, "R9");
        assert_eq!(hub.message_count(), 2);
    }

    #[test]
    fn test_stream_consumer_sees_arrival_order() {
        let hub = FeedHub::new();
        let mut stream = hub.stream(EventKind::RuleViolation);

        hub.on_envelope(violation("R1"));
        hub.on_envelope(interfaces(&["eth0"]));
        hub.on_envelope(violation("R2"));

        let ids: Vec<String> = tokio_test::block_on(async {
            let mut ids = Vec::new();
            for _ in 0..2 {
                if let Some(FeedEvent::RuleViolation(v)) = stream.next().await {
                    ids.push(v.rule_id);
                }
            }
            ids
        });
        assert_eq!(ids, vec!["R1", "R2"]);

        drop(stream);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
