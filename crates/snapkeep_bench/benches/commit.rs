//! Commit cycle benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use snapkeep_bench::{memory_engine, segment_changes};
use snapkeep_core::{CommitChanges, CommitWriter, Config, KeepOnlyLastCommit};
use snapkeep_storage::DirectoryStore;
use std::sync::Arc;
use tempfile::TempDir;

/// Benchmark commit cycles through the snapshot policy with held snapshots.
fn bench_commit_with_snapshots(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_with_held_snapshots");

    for held in [0usize, 4, 32].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(held), held, |b, &held| {
            let (writer, policy) = memory_engine(&Config::default().sync_on_commit(false));
            let mut seq = 0usize;
            let mut handles = Vec::new();
            for _ in 0..held {
                writer.commit(segment_changes(&writer, seq, 1, 64)).unwrap();
                handles.push(policy.snapshot_current().unwrap());
                seq += 1;
            }

            b.iter(|| {
                writer.commit(segment_changes(&writer, seq, 1, 64)).unwrap();
                seq += 1;
            });

            for handle in handles {
                handle.release();
            }
        });
    }

    group.finish();
}

/// Benchmark commits to a directory store with a plain primary policy.
fn bench_directory_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_commit");
    group.sample_size(20);

    for size in [1024usize, 16 * 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let store = Arc::new(DirectoryStore::open(temp_dir.path()).unwrap());
            let config = Config::default().sync_on_commit(false);
            let writer = CommitWriter::open(store, Arc::new(KeepOnlyLastCommit), &config).unwrap();
            writer.commit(CommitChanges::new()).unwrap();
            let mut seq = 0usize;

            b.iter(|| {
                writer.commit(segment_changes(&writer, seq, 1, size)).unwrap();
                seq += 1;
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_commit_with_snapshots, bench_directory_commit);
criterion_main!(benches);
