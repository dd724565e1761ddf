//! Codec benchmarks for wstomp-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use wstomp_protocol::{codec, Frame};

fn bench_encode_small(c: &mut Criterion) {
    let frame = Frame::send("/queue/test", "x".repeat(64));

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("small_64B", |b| b.iter(|| codec::encode(black_box(&frame))));
    group.finish();
}

fn bench_decode_small(c: &mut Criterion) {
    let frame = Frame::send("/queue/test", "x".repeat(64));
    let encoded = codec::encode(&frame);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("small_64B", |b| {
        b.iter(|| codec::decode(black_box(&encoded)))
    });
    group.finish();
}

fn bench_escaped_headers(c: &mut Criterion) {
    let frame = Frame::send("/topic/a:b:c", "payload")
        .header("correlation", "12:30:00\\batch\n7")
        .header("reply-to", "/temp-queue/a:b");

    c.bench_function("roundtrip_escaped_headers", |b| {
        b.iter(|| {
            let encoded = codec::encode(black_box(&frame));
            codec::decode(black_box(&encoded)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_encode_small,
    bench_decode_small,
    bench_escaped_headers
);
criterion_main!(benches);
