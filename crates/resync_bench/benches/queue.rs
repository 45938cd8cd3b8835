//! Task queue benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use resync_bench::{fill, random_payload};
use resync_engine::{Operation, SyncTaskQueue, TaskOptions, TaskStore};
use resync_storage::FileBlobStore;
use std::sync::Arc;
use tempfile::TempDir;

fn file_queue() -> (TempDir, SyncTaskQueue) {
    let dir = TempDir::new().unwrap();
    let blobs = FileBlobStore::open(dir.path()).unwrap();
    let queue = SyncTaskQueue::open(TaskStore::new(Arc::new(blobs))).unwrap();
    (dir, queue)
}

/// Each enqueue rewrites the whole snapshot, so cost grows with queue depth.
fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue");

    for depth in [0usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("memory", depth), &depth, |b, &depth| {
            b.iter_batched(
                || {
                    let queue = SyncTaskQueue::in_memory();
                    fill(&queue, depth, 128);
                    queue
                },
                |queue| {
                    let id = queue
                        .enqueue("members", Operation::Create, random_payload(128), TaskOptions::default())
                        .unwrap();
                    black_box(id);
                },
                BatchSize::SmallInput,
            );
        });
    }

    for depth in [0usize, 100] {
        group.bench_with_input(BenchmarkId::new("file", depth), &depth, |b, &depth| {
            b.iter_batched(
                || {
                    let (dir, queue) = file_queue();
                    fill(&queue, depth, 128);
                    (dir, queue)
                },
                |(_dir, queue)| {
                    let id = queue
                        .enqueue("members", Operation::Create, random_payload(128), TaskOptions::default())
                        .unwrap();
                    black_box(id);
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

fn bench_pending(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending");

    for count in [100usize, 1000, 10_000] {
        let queue = SyncTaskQueue::in_memory();
        fill(&queue, count, 64);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &queue, |b, queue| {
            b.iter(|| black_box(queue.pending()));
        });
    }

    group.finish();
}

fn bench_reopen(c: &mut Criterion) {
    let mut group = c.benchmark_group("reopen");

    for count in [100usize, 1000] {
        let dir = TempDir::new().unwrap();
        {
            let blobs = FileBlobStore::open(dir.path()).unwrap();
            let queue = SyncTaskQueue::open(TaskStore::new(Arc::new(blobs))).unwrap();
            fill(&queue, count, 128);
        }
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let blobs = FileBlobStore::open(dir.path()).unwrap();
                let queue = SyncTaskQueue::open(TaskStore::new(Arc::new(blobs))).unwrap();
                black_box(queue.len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_enqueue, bench_pending, bench_reopen);
criterion_main!(benches);
