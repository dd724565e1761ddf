//! Throughput benchmarks for wstomp.
//!
//! These benchmarks measure the raw frame throughput of the codec, the
//! subscription registry and the client send path.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Instant;
use wstomp_client::{StompMessage, Subscription, SubscriptionRegistry};
use wstomp_protocol::{codec, Frame};

const SIZES: [(usize, &str); 3] = [(64, "64B"), (1024, "1KB"), (65536, "64KB")];

/// Benchmark frame encoding.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for (size, label) in SIZES {
        let frame = Frame::send("/topic/bench", "x".repeat(size));
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(label, |b| b.iter(|| codec::encode(black_box(&frame))));
    }

    group.finish();
}

/// Benchmark frame decoding.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for (size, label) in SIZES {
        let encoded = wstomp_bench::message_frame("sub-1", size);
        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_function(label, |b| {
            b.iter(|| codec::decode(black_box(&encoded)))
        });
    }

    group.finish();
}

/// Benchmark subscription lookup with many live subscriptions.
fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_lookup");

    for size in [10, 100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let registry = SubscriptionRegistry::new();
            for i in 0..size {
                registry.insert(Subscription::new(
                    format!("sub-{}", i),
                    format!("/topic/{}", i % 16),
                    Arc::new(|_: StompMessage| {}),
                ));
            }
            let id = format!("sub-{}", size / 2);

            b.iter(|| registry.get(black_box(&id)));
        });
    }

    group.finish();
}

/// Benchmark the client SEND path over the in-memory transport.
fn bench_send(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (client, mut peer) = rt.block_on(wstomp_bench::connected_client()).unwrap();

    let mut group = c.benchmark_group("client_send");
    for (size, label) in SIZES {
        let body = "x".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(label, |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();
                for _ in 0..iters {
                    client.send("/queue/bench", body.as_str()).unwrap();
                }
                let elapsed = start.elapsed();
                while peer.try_recv().is_some() {}
                elapsed
            });
        });
    }
    group.finish();

    client.disconnect();
}

criterion_group!(benches, bench_encode, bench_decode, bench_registry, bench_send);
criterion_main!(benches);
