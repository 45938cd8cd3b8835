//! In-memory blob store for testing.

use crate::backend::{validate_key, BlobStore};
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory blob store.
///
/// This store keeps all blobs in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Queues that don't need to survive a restart
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use resync_storage::{BlobStore, InMemoryBlobStore};
///
/// let store = InMemoryBlobStore::new();
/// store.write_blob("k", b"test data").unwrap();
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with a pre-existing blob.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_blob(key: impl Into<String>, data: Vec<u8>) -> Self {
        let store = Self::new();
        store.blobs.write().insert(key.into(), data);
        store
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no blob is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Removes every blob.
    pub fn clear(&self) {
        self.blobs.write().clear();
    }
}

impl BlobStore for InMemoryBlobStore {
    fn read_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.blobs.read().get(key).cloned())
    }

    fn write_blob(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.blobs.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn remove_blob(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self.blobs.write().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[test]
    fn memory_read_missing() {
        let store = InMemoryBlobStore::new();
        assert_eq!(store.read_blob("nothing").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn memory_write_replaces() {
        let store = InMemoryBlobStore::new();
        store.write_blob("k", b"first").unwrap();
        store.write_blob("k", b"second").unwrap();

        assert_eq!(store.read_blob("k").unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_with_blob() {
        let store = InMemoryBlobStore::with_blob("k", vec![1, 2, 3]);
        assert_eq!(store.read_blob("k").unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn memory_remove() {
        let store = InMemoryBlobStore::new();
        store.write_blob("k", b"x").unwrap();

        assert!(store.remove_blob("k").unwrap());
        assert!(!store.remove_blob("k").unwrap());
        assert_eq!(store.read_blob("k").unwrap(), None);
    }

    #[test]
    fn memory_rejects_bad_key() {
        let store = InMemoryBlobStore::new();
        let result = store.write_blob("../x", b"x");
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn memory_clear() {
        let store = InMemoryBlobStore::new();
        store.write_blob("a", b"1").unwrap();
        store.write_blob("b", b"2").unwrap();
        store.clear();
        assert!(store.is_empty());
    }
}
