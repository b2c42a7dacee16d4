//! # End-to-End Feed Tests
//!
//! A real [`feed_mock::MockFeedServer`] on `127.0.0.1:0` feeding a real
//! [`feed_client::FeedContext`] over loopback.
//!
//! ## Flows Tested:
//!
//! 1. **Greeting**: `interfaces` is the first envelope every client sees
//! 2. **Streaming**: packet updates (flat and string-encoded) decode and
//!    drive packet metrics; violations accumulate
//! 3. **Outbound**: sends reach the server only while connected
//! 4. **Lifecycle**: server close, reconnect, and explicit disconnect

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use feed_bus::{EventKind, FeedEvent, PacketPayload};
    use feed_client::{ConnectionStatus, FeedConfig, FeedContext, SendOutcome};
    use feed_mock::{MockFeedServer, MockServerConfig, MockServerHandle};
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(10);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn start_server(violation_probability: f64) -> MockServerHandle {
        let config = MockServerConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            packet_interval: Duration::from_millis(20),
            violation_interval: Duration::from_millis(30),
            violation_probability,
            seed: Some(7),
        };
        MockFeedServer::bind(config)
            .await
            .expect("bind mock server")
            .spawn()
            .expect("spawn mock server")
    }

    async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
        let waited = timeout(WAIT, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {what}");
    }

    async fn wait_for_status(ctx: &FeedContext, pred: impl FnMut(&ConnectionStatus) -> bool) {
        let mut rx = ctx.watch_status();
        timeout(WAIT, rx.wait_for(pred))
            .await
            .expect("timed out waiting for status")
            .expect("status channel closed");
    }

    // =============================================================================
    // STREAMING
    // =============================================================================

    #[tokio::test]
    async fn test_interfaces_arrive_first() {
        let server = start_server(0.0).await;
        let ctx = FeedContext::new(FeedConfig::default());
        let hub = ctx.hub();

        let kinds = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&kinds);
        let _all = hub.subscribe_all(move |event: &FeedEvent| {
            recorder.lock().push(event.kind());
            Ok(())
        });

        ctx.connect(&server.url()).unwrap();
        eventually("three envelopes", || kinds.lock().len() >= 3).await;

        let kinds = kinds.lock().clone();
        assert_eq!(kinds[0], EventKind::Interfaces);
        assert!(kinds[1..].iter().all(|k| *k == EventKind::PacketUpdate));

        let names: Vec<String> = hub
            .latest_interfaces()
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert!(names.contains(&"eth0".to_string()));

        ctx.disconnect();
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_packets_decode_and_drive_metrics() {
        let server = start_server(0.0).await;
        let ctx = FeedContext::new(FeedConfig::default());
        let hub = ctx.hub();

        ctx.connect(&server.url()).unwrap();
        eventually("ten packets", || hub.message_count() >= 11).await;

        for entry in hub.messages() {
            if let FeedEvent::PacketUpdate(payload) = &entry.event {
                assert!(
                    matches!(payload, PacketPayload::Decoded(_)),
                    "packet {} was not decoded",
                    entry.seq
                );
            }
        }

        let metrics = hub.packet_metrics().expect("metrics after decoded packets");
        assert!(metrics.total_packets >= 10);
        assert!(metrics.avg_size < 1500.0);

        ctx.disconnect();
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_violations_accumulate() {
        let server = start_server(1.0).await;
        let ctx = FeedContext::new(FeedConfig::default());
        let hub = ctx.hub();

        ctx.connect(&server.url()).unwrap();
        eventually("three violations", || hub.rule_violations().len() >= 3).await;

        let history = hub.rule_violations();
        let latest = hub.latest_violation().unwrap();
        assert!(history.contains(&latest));
        assert!(history.iter().all(|v| v.rule_id.starts_with('R')));

        ctx.disconnect();
        server.shutdown().await;
    }

    // =============================================================================
    // OUTBOUND
    // =============================================================================

    #[tokio::test]
    async fn test_send_reaches_server() {
        let server = start_server(0.0).await;
        let ctx = FeedContext::new(FeedConfig::default());

        ctx.connect(&server.url()).unwrap();
        wait_for_status(&ctx, ConnectionStatus::is_connected).await;

        let outcome = ctx.send(json!({"command": "set_filter", "protocol": "TCP"})).unwrap();
        assert_eq!(outcome, SendOutcome::Sent);

        eventually("server to receive", || !server.received_messages().is_empty()).await;
        let received: serde_json::Value =
            serde_json::from_str(&server.received_messages()[0]).unwrap();
        assert_eq!(received["command"], "set_filter");

        ctx.disconnect();
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_before_connect_is_not_queued() {
        let server = start_server(0.0).await;
        let ctx = FeedContext::new(FeedConfig::default());

        let outcome = ctx.send("hello").unwrap();
        assert!(matches!(outcome, SendOutcome::Rejected(_)));
        assert!(ctx.last_warning().is_some());

        ctx.connect(&server.url()).unwrap();
        wait_for_status(&ctx, ConnectionStatus::is_connected).await;
        assert!(ctx.send("after").unwrap().is_sent());

        eventually("server to receive", || !server.received_messages().is_empty()).await;
        assert_eq!(server.received_messages(), vec!["after"]);

        ctx.disconnect();
        server.shutdown().await;
    }

    // =============================================================================
    // LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_server_shutdown_disconnects_client() {
        let server = start_server(0.0).await;
        let ctx = FeedContext::new(FeedConfig::default());

        ctx.connect(&server.url()).unwrap();
        wait_for_status(&ctx, ConnectionStatus::is_connected).await;

        server.shutdown().await;
        wait_for_status(&ctx, |s| !s.is_connected()).await;

        assert!(matches!(
            ctx.send("late").unwrap(),
            SendOutcome::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn test_reconnect_resets_state_but_keeps_subscribers() {
        let first = start_server(0.0).await;
        let second = start_server(0.0).await;
        let ctx = FeedContext::new(FeedConfig::default());
        let hub = ctx.hub();

        let greetings = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&greetings);
        let _sub = hub.subscribe(EventKind::Interfaces, move |_: &FeedEvent| {
            *counter.lock() += 1;
            Ok(())
        });

        ctx.connect(&first.url()).unwrap();
        eventually("first greeting", || *greetings.lock() == 1).await;

        ctx.connect(&second.url()).unwrap();
        assert!(hub.latest_interfaces().is_none());
        assert!(hub.packet_metrics().is_none());

        eventually("second greeting", || *greetings.lock() == 2).await;
        assert_eq!(hub.messages()[0].event.kind(), EventKind::Interfaces);

        ctx.disconnect();
        first.shutdown().await;
        second.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_stops_delivery() {
        let server = start_server(0.0).await;
        let ctx = FeedContext::new(FeedConfig::default());
        let hub = ctx.hub();

        ctx.connect(&server.url()).unwrap();
        eventually("some packets", || hub.message_count() >= 3).await;

        ctx.disconnect();
        assert_eq!(ctx.status(), ConnectionStatus::Disconnected);

        // Let any frame already in flight land, then confirm the count holds.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = hub.message_count();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hub.message_count(), settled);

        // Cache survives a plain disconnect.
        assert!(hub.latest_interfaces().is_some());

        server.shutdown().await;
    }
}
