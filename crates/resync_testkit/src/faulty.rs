//! Failure injection for blob stores.
//!
//! [`FlakyBlobStore`] wraps a real store and fails writes on demand, so
//! tests can check that the queue keeps working in memory, reports itself
//! as not durable, and recovers on the next good save.

use resync_storage::{BlobStore, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A blob store wrapper that can simulate write failures.
pub struct FlakyBlobStore {
    inner: Arc<dyn BlobStore>,
    fail_after_writes: AtomicUsize,
    writes: AtomicUsize,
    failed_writes: AtomicUsize,
    fail_reads: AtomicBool,
}

impl FlakyBlobStore {
    /// Wraps `inner`; all operations pass through until told otherwise.
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            fail_after_writes: AtomicUsize::new(usize::MAX),
            writes: AtomicUsize::new(0),
            failed_writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Makes every write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        let threshold = if fail { 0 } else { usize::MAX };
        self.fail_after_writes.store(threshold, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Lets `count` more writes through, then fails the rest.
    pub fn fail_after(&self, count: usize) {
        self.writes.store(0, Ordering::SeqCst);
        self.fail_after_writes.store(count, Ordering::SeqCst);
    }

    /// Makes reads fail with an I/O error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of writes rejected so far.
    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }

    /// Clears all failure settings and counters.
    pub fn reset(&self) {
        self.fail_after_writes.store(usize::MAX, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        self.failed_writes.store(0, Ordering::SeqCst);
        self.fail_reads.store(false, Ordering::SeqCst);
    }

    fn simulated(what: &str) -> StorageError {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("simulated {what} failure"),
        ))
    }
}

impl BlobStore for FlakyBlobStore {
    fn read_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::simulated("read"));
        }
        self.inner.read_blob(key)
    }

    fn write_blob(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let done = self.writes.fetch_add(1, Ordering::SeqCst);
        if done >= self.fail_after_writes.load(Ordering::SeqCst) {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(Self::simulated("write"));
        }
        self.inner.write_blob(key, data)
    }

    fn remove_blob(&self, key: &str) -> StorageResult<bool> {
        self.inner.remove_blob(key)
    }
}
