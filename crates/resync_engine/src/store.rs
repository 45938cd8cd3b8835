//! Durable task snapshots.
//!
//! The whole queue is persisted as one JSON envelope under a single blob
//! key and replaced on every save:
//!
//! ```text
//! { "version": 1, "next_sequence": 7, "last_created_at": 1700000000000, "tasks": [...] }
//! ```

use crate::error::{EngineError, EngineResult};
use crate::task::{SyncTask, TaskState};
use resync_storage::{BlobStore, InMemoryBlobStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default blob key for the queue snapshot.
pub const DEFAULT_SNAPSHOT_KEY: &str = "sync_tasks";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The persisted queue state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Sequence number for the next enqueued task.
    pub next_sequence: u64,
    /// Highest `created_at` handed out so far.
    pub last_created_at: u64,
    /// Resident tasks in insertion order.
    pub tasks: Vec<SyncTask>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_sequence: 0,
            last_created_at: 0,
            tasks: Vec::new(),
        }
    }

    /// Builds a snapshot from tasks alone, deriving the counters.
    #[must_use]
    pub fn from_tasks(tasks: &[SyncTask]) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_sequence: tasks.iter().map(|t| t.sequence + 1).max().unwrap_or(0),
            last_created_at: tasks.iter().map(|t| t.created_at).max().unwrap_or(0),
            tasks: tasks.to_vec(),
        }
    }
}

/// Loads and saves queue snapshots through a [`BlobStore`].
pub struct TaskStore {
    blobs: Arc<dyn BlobStore>,
    key: String,
}

impl TaskStore {
    /// Creates a store using [`DEFAULT_SNAPSHOT_KEY`].
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_key(blobs, DEFAULT_SNAPSHOT_KEY)
    }

    /// Creates a store using a custom key.
    pub fn with_key(blobs: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }

    /// Creates a store over a fresh in-memory blob store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBlobStore::new()))
    }

    /// Returns the snapshot key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the key a corrupt snapshot is moved to.
    #[must_use]
    pub fn quarantine_key(&self) -> String {
        format!("{}.corrupt", self.key)
    }

    /// Loads the snapshot, resetting any `InFlight` task to `Pending`.
    ///
    /// A missing snapshot loads as empty. A snapshot that cannot be decoded
    /// is copied to [`quarantine_key`](Self::quarantine_key) and loads as
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob store fails, the snapshot version is
    /// unknown, or a corrupt snapshot cannot be quarantined.
    pub fn load_snapshot(&self) -> EngineResult<Snapshot> {
        let Some(bytes) = self.blobs.read_blob(&self.key)? else {
            return Ok(Snapshot::empty());
        };

        let mut snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let quarantine = self.quarantine_key();
                tracing::error!(
                    key = %self.key,
                    quarantine = %quarantine,
                    error = %e,
                    "task snapshot is corrupt, starting with an empty queue"
                );
                self.blobs.write_blob(&quarantine, &bytes)?;
                return Ok(Snapshot::empty());
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::UnsupportedSnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let mut recovered = 0usize;
        for task in &mut snapshot.tasks {
            if task.state == TaskState::InFlight {
                task.state = TaskState::Pending;
                recovered += 1;
            }
        }
        if recovered > 0 {
            tracing::info!(recovered, "reset interrupted tasks to pending");
        }

        // Older writers may have persisted counters behind the tasks.
        let derived = Snapshot::from_tasks(&snapshot.tasks);
        snapshot.next_sequence = snapshot.next_sequence.max(derived.next_sequence);
        snapshot.last_created_at = snapshot.last_created_at.max(derived.last_created_at);

        tracing::debug!(tasks = snapshot.tasks.len(), "loaded task snapshot");
        Ok(snapshot)
    }

    /// Replaces the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails; the previous
    /// snapshot is then left intact.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> EngineResult<()> {
        let bytes = serde_json::to_vec(snapshot)?;
        self.blobs.write_blob(&self.key, &bytes)?;
        Ok(())
    }

    /// Loads the resident tasks.
    ///
    /// # Errors
    ///
    /// See [`load_snapshot`](Self::load_snapshot).
    pub fn load(&self) -> EngineResult<Vec<SyncTask>> {
        self.load_snapshot().map(|s| s.tasks)
    }

    /// Persists exactly these tasks.
    ///
    /// # Errors
    ///
    /// See [`save_snapshot`](Self::save_snapshot).
    pub fn save(&self, tasks: &[SyncTask]) -> EngineResult<()> {
        self.save_snapshot(&Snapshot::from_tasks(tasks))
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
