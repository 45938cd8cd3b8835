//! CLI command implementations.

pub mod edit;
pub mod list;
pub mod probe;
pub mod stats;

use resync_engine::{SyncTaskQueue, TaskStore, DEFAULT_SNAPSHOT_KEY};
use resync_storage::FileBlobStore;
use std::path::Path;
use std::sync::Arc;

/// Opens the queue stored in `path`.
///
/// Fails if the directory holds no snapshot, so typos do not silently
/// create empty queues.
pub fn open_existing(path: &Path) -> Result<SyncTaskQueue, Box<dyn std::error::Error>> {
    if !path.join(DEFAULT_SNAPSHOT_KEY).exists() {
        return Err(format!("No queue found at {}", path.display()).into());
    }
    open_or_create(path)
}

/// Opens the queue stored in `path`, creating the directory if needed.
pub fn open_or_create(path: &Path) -> Result<SyncTaskQueue, Box<dyn std::error::Error>> {
    tracing::debug!(path = %path.display(), "opening queue");
    let blobs = FileBlobStore::open(path)?;
    let queue = SyncTaskQueue::open(TaskStore::new(Arc::new(blobs)))?;
    Ok(queue)
}
