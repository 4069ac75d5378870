//! End-to-end changeset apply benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use replidb_bench::{base_file_changeset, block_changeset};
use replidb_replication::{MemoryConnection, Replicator, ReplicatorConfig};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn apply_once(replicator: &Replicator, changeset: &[u8]) {
    let mut conn = MemoryConnection::changeset(changeset.to_vec());
    let deadline = Instant::now() + Duration::from_secs(60);
    replicator.apply_changeset(&mut conn, deadline, false).unwrap();
}

/// Benchmark applying block sequences of increasing length.
fn bench_apply_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_blocks");
    group.sample_size(20);

    for count in [16usize, 256, 1024].iter() {
        let changeset = block_changeset(*count, 4096);
        let temp = TempDir::new().unwrap();
        let replicator = Replicator::new(temp.path(), ReplicatorConfig::default());

        group.throughput(Throughput::Bytes(changeset.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &changeset, |b, changeset| {
            b.iter(|| apply_once(&replicator, changeset));
        });
    }

    group.finish();
}

/// Benchmark base file replacement, which pays for an fsync and a rename.
fn bench_apply_base_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_base_file");
    group.sample_size(20);

    for size in [256usize, 65_536].iter() {
        let changeset = base_file_changeset(*size);
        let temp = TempDir::new().unwrap();
        let replicator = Replicator::new(
            temp.path(),
            ReplicatorConfig::new().sync_directory(false),
        );

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &changeset, |b, changeset| {
            b.iter(|| apply_once(&replicator, changeset));
        });
    }

    group.finish();
}

/// Benchmark applying with journaling enabled.
fn bench_apply_journaled(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_journaled");
    group.sample_size(20);

    let changeset = block_changeset(256, 4096);
    let temp = TempDir::new().unwrap();
    let replicator = Replicator::new(temp.path(), ReplicatorConfig::new().max_changesets(4));

    group.throughput(Throughput::Bytes(changeset.len() as u64));
    group.bench_function("256_blocks", |b| {
        b.iter(|| apply_once(&replicator, &changeset));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_apply_blocks,
    bench_apply_base_file,
    bench_apply_journaled,
);

criterion_main!(benches);
