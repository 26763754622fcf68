//! Benchmarks for the session activity trace.
//!
//! The full trace is rendered into every command result and every outward
//! event, so `Trace::snapshot` sits on the hot path of tag delivery. These
//! benchmarks track how rendering cost grows with trace length and how much
//! concurrent appends from driver threads contend with snapshots.
//!
//! # Running
//!
//! ```sh
//! cargo bench --bench trace_bench
//! ```
//!
//! Save a baseline before a change and compare afterwards:
//!
//! ```sh
//! cargo bench --bench trace_bench -- --save-baseline main
//! cargo bench --bench trace_bench -- --baseline main
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rfidlink_session::Trace;
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

fn filled(entries: usize) -> Trace {
    let trace = Trace::new("session created");
    for i in 1..entries {
        trace.record(format!("[TAG_READ] Read {i} tags"));
    }
    trace
}

/// Append cost, including the timestamp and the debug event.
fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace_record");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single_entry", |b| {
        let trace = Trace::new("session created");
        b.iter(|| trace.record(black_box("[TAG_READ] Read 100 tags")));
    });

    group.finish();
}

/// Rendering cost across trace lengths a long-running session reaches.
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace_snapshot");

    for entries in [10, 100, 1_000, 10_000] {
        let trace = filled(entries);
        group.throughput(Throughput::Elements(entries as u64));

        group.bench_with_input(BenchmarkId::from_parameter(entries), &trace, |b, trace| {
            b.iter(|| black_box(trace.snapshot()));
        });
    }

    group.finish();
}

/// Snapshots taken while another thread keeps appending.
fn bench_snapshot_under_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace_snapshot_contended");

    let trace = Arc::new(filled(1_000));
    group.bench_function("one_writer", |b| {
        b.iter_custom(|iters| {
            let writer = {
                let trace = Arc::clone(&trace);
                thread::spawn(move || {
                    for i in 0..iters {
                        trace.record(format!("[STATUS] Event: {i}"));
                    }
                })
            };

            let start = std::time::Instant::now();
            for _ in 0..iters {
                black_box(trace.snapshot());
            }
            let elapsed = start.elapsed();

            writer.join().unwrap();
            elapsed
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_record,
    bench_snapshot,
    bench_snapshot_under_contention
);
criterion_main!(benches);
