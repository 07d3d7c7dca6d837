//! Benchmarks for the hubstream library
//!
//! Run with: cargo bench -p hubstream

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use hubstream::codec::{self, WireFormat};
use hubstream::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use hubstream::{DottedParser, EscapedParser, FrameDecoder, FrameParser};

/// Benchmark frame encoding and decoding
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let frame = codec::encode("3456", "orders", b"created.42");
    group.throughput(Throughput::Bytes(frame.len() as u64));

    group.bench_function("encode_dotted", |b| {
        b.iter(|| codec::encode(black_box("3456"), black_box("orders"), black_box(b"created.42")))
    });

    group.bench_function("decode_dotted", |b| {
        b.iter(|| codec::decode(black_box(&frame)))
    });

    group.bench_function("parse_dotted", |b| {
        b.iter(|| DottedParser.parse(black_box(&frame[..frame.len() - 1])))
    });

    let escaped = WireFormat::Escaped.encode("svc.a", "eu.orders", b"created.42");
    group.bench_function("encode_escaped", |b| {
        b.iter(|| {
            WireFormat::Escaped.encode(
                black_box("svc.a"),
                black_box("eu.orders"),
                black_box(b"created.42"),
            )
        })
    });

    group.bench_function("parse_escaped", |b| {
        b.iter(|| EscapedParser.parse(black_box(&escaped[..escaped.len() - 1])))
    });

    group.finish();
}

/// Benchmark the streaming newline decoder
fn bench_frame_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decoder");

    let burst: Vec<u8> = (0..100)
        .flat_map(|i| codec::encode("3456", "orders", format!("created.{}", i).as_bytes()))
        .collect();
    group.throughput(Throughput::Bytes(burst.len() as u64));

    // 100 frames in one read
    group.bench_function("single_read_100_frames", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::default();
            decoder.extend(black_box(&burst));
            let mut count = 0;
            while decoder.next_frame().is_some() {
                count += 1;
            }
            black_box(count)
        })
    });

    // Same bytes fed through 1 KiB reads
    group.bench_function("chunked_reads_100_frames", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::default();
            let mut count = 0;
            for chunk in burst.chunks(1024) {
                decoder.extend(black_box(chunk));
                while decoder.next_frame().is_some() {
                    count += 1;
                }
            }
            black_box(count)
        })
    });

    group.finish();
}

/// Benchmark atomic state and metrics operations
fn bench_atomics(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomics");

    group.bench_function("state_get", |b| {
        let state = AtomicConnectionState::new(ConnectionState::ReadingLoop);
        b.iter(|| black_box(state.get()))
    });

    group.bench_function("state_is_connected", |b| {
        let state = AtomicConnectionState::new(ConnectionState::ReadingLoop);
        b.iter(|| black_box(state.is_connected()))
    });

    group.bench_function("metrics_increment_received", |b| {
        let metrics = AtomicMetrics::new();
        b.iter(|| metrics.increment_received())
    });

    group.finish();
}

criterion_group!(benches, bench_codec, bench_frame_decoder, bench_atomics);
criterion_main!(benches);
