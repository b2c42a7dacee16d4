//! # NetWatch Dispatch Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | decode `packet_update` (flat / string-encoded) | < 20µs |
//! | `on_envelope` with N subscribers | < 50µs at N = 64 |
//! | `latest` snapshot read | < 1µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use feed_bus::{decode, EventKind, FeedEvent, FeedHub, RawMessage};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn packet_frame(nested: bool) -> String {
    let packet = json!({
        "src_ip": "192.168.1.10",
        "dst_ip": "10.0.0.1",
        "src_port": 51515,
        "dst_port": 443,
        "protocol": "HTTPS",
        "length": 1200,
        "timestamp": "2024-01-01T00:00:00.000Z",
        "pcap_stats": {"received": 1000, "dropped_kernel": 3, "dropped_interface": 1},
        "avg_stats": {"avg_packet_size": 640.5, "packets_per_second": 120.25}
    });
    let packet_info = if nested {
        json!(packet.to_string())
    } else {
        packet
    };
    json!({"type": "packet_update", "packet_info": packet_info}).to_string()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for nested in [false, true] {
        let frame = packet_frame(nested);
        let label = if nested { "string_encoded" } else { "flat" };
        group.bench_function(BenchmarkId::new("packet_update", label), |b| {
            b.iter(|| black_box(decode(RawMessage::Text(frame.clone()))))
        });
    }

    group.bench_function("not_json", |b| {
        b.iter(|| black_box(decode(RawMessage::Text("capture started".to_string()))))
    });

    group.finish();
}

fn bench_on_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("on_envelope");
    let frame = packet_frame(false);

    for subscribers in [1usize, 8, 64] {
        let hub = FeedHub::new();
        let delivered = Arc::new(AtomicU64::new(0));
        let subs: Vec<_> = (0..subscribers)
            .map(|_| {
                let counter = Arc::clone(&delivered);
                hub.subscribe(EventKind::PacketUpdate, move |_: &FeedEvent| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
            })
            .collect();

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("packet_update", subscribers),
            &frame,
            |b, frame| {
                b.iter(|| {
                    let report = hub.on_envelope(RawMessage::Text(frame.clone()));
                    // Keep the log from growing across iterations.
                    hub.clear_messages();
                    black_box(report)
                })
            },
        );

        drop(subs);
    }

    group.finish();
}

fn bench_latest(c: &mut Criterion) {
    let hub = FeedHub::new();
    hub.on_envelope(RawMessage::Text(packet_frame(false)));

    c.bench_function("latest_packet_update", |b| {
        b.iter(|| black_box(hub.latest(&EventKind::PacketUpdate)))
    });
    c.bench_function("packet_metrics", |b| {
        b.iter(|| black_box(hub.packet_metrics()))
    });
}

criterion_group!(benches, bench_decode, bench_on_envelope, bench_latest);
criterion_main!(benches);
