//! Latency benchmarks for wstomp.
//!
//! These benchmarks measure the time from a frame reaching the client to
//! its handler running.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use wstomp_client::StompMessage;
use wstomp_protocol::codec;

/// Benchmark decode + routing + handler invocation for one MESSAGE.
fn bench_dispatch_latency(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (client, peer) = rt.block_on(wstomp_bench::connected_client()).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = client
        .subscribe("/topic/bench", move |message: StompMessage| {
            let _ = tx.send(message.body().len());
        })
        .unwrap();
    let frame = wstomp_bench::message_frame(&id, 64);

    let mut group = c.benchmark_group("dispatch_latency");
    group.bench_function("single_subscriber", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let start = Instant::now();
                    peer.text(frame.as_str());
                    let _ = rx.recv().await;
                    total += start.elapsed();
                }
                total
            })
        });
    });
    group.finish();

    client.disconnect();
}

/// Benchmark round-trip encode/decode latency.
fn bench_codec_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_roundtrip");

    let encoded = wstomp_bench::message_frame("sub-1", 256);

    group.bench_function("256B", |b| {
        b.iter(|| {
            let frame = codec::decode(black_box(&encoded)).unwrap();
            codec::encode(black_box(&frame))
        });
    });

    group.finish();
}

/// Benchmark building a handler message from a decoded frame.
fn bench_message_creation(c: &mut Criterion) {
    let encoded = wstomp_bench::message_frame("sub-1", 64);
    let frame = codec::decode(&encoded).unwrap();

    c.bench_function("message_from_frame", |b| {
        b.iter(|| StompMessage::from_frame(black_box(frame.clone())))
    });
}

criterion_group!(
    benches,
    bench_dispatch_latency,
    bench_codec_roundtrip,
    bench_message_creation,
);
criterion_main!(benches);
