//! Snapshot acquire/release benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use snapkeep_bench::{memory_engine, segment_changes};
use snapkeep_core::{Config, PrimaryPolicy};
use std::sync::Arc;
use std::thread;

/// Benchmark snapshotting and releasing the current commit.
fn bench_snapshot_current(c: &mut Criterion) {
    let (writer, policy) = memory_engine(&Config::default().sync_on_commit(false));
    writer.commit(segment_changes(&writer, 0, 1, 64)).unwrap();

    c.bench_function("snapshot_current_release", |b| {
        b.iter(|| {
            let handle = policy.snapshot_current().unwrap();
            black_box(handle.release());
        });
    });
}

/// Benchmark bundle snapshots over growing live lists.
fn bench_snapshot_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_all_release");

    for live in [1usize, 8, 64].iter() {
        group.throughput(Throughput::Elements(*live as u64));
        group.bench_with_input(BenchmarkId::from_parameter(live), live, |b, &live| {
            let config = Config::default()
                .sync_on_commit(false)
                .primary(PrimaryPolicy::KeepLast(live));
            let (writer, policy) = memory_engine(&config);
            for seq in 0..live {
                writer.commit(segment_changes(&writer, seq, 1, 64)).unwrap();
            }

            b.iter(|| {
                let bundle = policy.snapshot().unwrap();
                black_box(bundle.release());
            });
        });
    }

    group.finish();
}

/// Benchmark contended snapshot/release from several threads.
fn bench_contended_snapshots(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_snapshots");
    group.sample_size(20);

    for threads in [2usize, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(threads), threads, |b, &threads| {
            let (writer, policy) = memory_engine(&Config::default().sync_on_commit(false));
            writer.commit(segment_changes(&writer, 0, 1, 64)).unwrap();

            b.iter(|| {
                thread::scope(|scope| {
                    for _ in 0..threads {
                        let policy = Arc::clone(&policy);
                        scope.spawn(move || {
                            for _ in 0..100 {
                                let handle = policy.snapshot_current().unwrap();
                                black_box(handle.release());
                            }
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_snapshot_current,
    bench_snapshot_all,
    bench_contended_snapshots
);
criterion_main!(benches);
