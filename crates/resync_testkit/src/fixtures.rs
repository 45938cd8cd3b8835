//! Test fixtures and queue helpers.
//!
//! Provides convenience functions for setting up queues and coordinators
//! in tests.

use resync_engine::{
    DataStoreTransport, Operation, Payload, SyncConfig, SyncCoordinator, SyncTaskQueue,
    TaskOptions, TaskStore,
};
use resync_net::{RequestExecutor, RetryPolicy};
use resync_storage::{BlobStore, FileBlobStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A file-backed test queue with automatic cleanup.
pub struct TestQueue {
    /// The queue instance.
    pub queue: Arc<SyncTaskQueue>,
    temp_dir: TempDir,
}

impl TestQueue {
    /// Creates an empty queue in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let queue = open_queue(temp_dir.path());
        Self {
            queue: Arc::new(queue),
            temp_dir,
        }
    }

    /// Returns the directory holding the blob files.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Simulates a restart: drops the queue and opens it again from disk.
    ///
    /// Panics if another handle to the queue is still alive, since the
    /// directory lock would still be held.
    pub fn reopen(self) -> Self {
        let Self { queue, temp_dir } = self;
        assert!(
            Arc::try_unwrap(queue).is_ok(),
            "queue still shared, cannot reopen"
        );
        let queue = open_queue(temp_dir.path());
        Self {
            queue: Arc::new(queue),
            temp_dir,
        }
    }
}

impl std::ops::Deref for TestQueue {
    type Target = SyncTaskQueue;

    fn deref(&self) -> &Self::Target {
        &self.queue
    }
}

fn open_queue(dir: &Path) -> SyncTaskQueue {
    let blobs = FileBlobStore::open(dir).expect("Failed to open blob store");
    SyncTaskQueue::open(TaskStore::new(Arc::new(blobs))).expect("Failed to open queue")
}

/// Opens a queue over an arbitrary blob store.
pub fn queue_over(blobs: Arc<dyn BlobStore>) -> SyncTaskQueue {
    SyncTaskQueue::open(TaskStore::new(blobs)).expect("Failed to open queue")
}

/// A retry policy with millisecond delays, for fast tests.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new()
        .with_base_delay(std::time::Duration::from_millis(10))
        .with_max_delay(std::time::Duration::from_millis(50))
        .with_request_timeout(std::time::Duration::from_millis(500))
}

/// Builds a coordinator over `queue` and `transport`.
pub fn coordinator(
    queue: Arc<SyncTaskQueue>,
    transport: Arc<dyn DataStoreTransport>,
    config: SyncConfig,
) -> Arc<SyncCoordinator> {
    Arc::new(SyncCoordinator::new(
        queue,
        transport,
        Arc::new(RequestExecutor::default()),
        config,
    ))
}

/// A JSON payload `{"n": n}`.
pub fn sample_payload(n: u64) -> Payload {
    Payload::from_json(&serde_json::json!({ "n": n })).expect("json payload")
}

/// Enqueues `ops` and returns their ids.
pub fn enqueue_all(
    queue: &SyncTaskQueue,
    ops: &[(&str, Operation)],
    options: TaskOptions,
) -> Vec<resync_engine::TaskId> {
    ops.iter()
        .enumerate()
        .map(|(i, (entity, op))| {
            queue
                .enqueue(entity, *op, sample_payload(i as u64), options)
                .expect("enqueue")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopen_keeps_tasks() {
        let fixture = TestQueue::file();
        enqueue_all(
            &fixture,
            &[("a", Operation::Create), ("b", Operation::Delete)],
            TaskOptions::default(),
        );
        assert!(fixture.path().join("sync_tasks").exists());

        let fixture = fixture.reopen();
        assert_eq!(fixture.pending().len(), 2);
    }

    #[test]
    fn payload_is_json() {
        let value: serde_json::Value = sample_payload(7).to_json().unwrap();
        assert_eq!(value["n"], 7);
    }
}
