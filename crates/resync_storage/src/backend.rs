//! Blob store trait definition.

use crate::error::{StorageError, StorageResult};

/// A durable key-value store for opaque blobs.
///
/// Blob stores are **opaque byte stores**. The task queue keeps its whole
/// snapshot under one well-known key and replaces it on every save.
///
/// # Invariants
///
/// - `read_blob` returns exactly the bytes of the last successful `write_blob`
/// - `write_blob` is all-or-nothing: on error the previous blob is intact
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBlobStore`] - For testing
/// - [`super::FileBlobStore`] - For persistent storage
/// - [`super::EncryptedBlobStore`] - Encryption at rest over another store
pub trait BlobStore: Send + Sync {
    /// Reads the blob stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing has been written under the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn read_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the blob stored under `key`.
    ///
    /// After this returns successfully the new blob is guaranteed to
    /// survive process termination (for durable stores).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails. A failed
    /// write leaves the previous blob readable.
    fn write_blob(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Removes the blob stored under `key`.
    ///
    /// Returns `true` if a blob was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn remove_blob(&self, key: &str) -> StorageResult<bool>;
}

impl<S: BlobStore + ?Sized> BlobStore for std::sync::Arc<S> {
    fn read_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).read_blob(key)
    }

    fn write_blob(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        (**self).write_blob(key, data)
    }

    fn remove_blob(&self, key: &str) -> StorageResult<bool> {
        (**self).remove_blob(key)
    }
}

/// Checks that `key` is usable as a blob name on every store.
///
/// Keys are 1..=128 characters of `[A-Za-z0-9._-]` and must not start
/// with a dot, so they map to plain file names.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] if the key is rejected.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid_chars = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if key.is_empty() || key.len() > 128 || key.starts_with('.') || !valid_chars {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_keys() {
        assert!(validate_key("sync_tasks").is_ok());
        assert!(validate_key("sync_tasks.corrupt").is_ok());
        assert!(validate_key("queue-2").is_ok());
    }

    #[test]
    fn rejects_path_like_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key(&"k".repeat(129)).is_err());
    }

    proptest::proptest! {
        #[test]
        fn generated_keys_are_valid(key in "[A-Za-z0-9_-][A-Za-z0-9._-]{0,127}") {
            proptest::prop_assert!(validate_key(&key).is_ok());
        }

        #[test]
        fn keys_with_separators_are_rejected(prefix in "[a-z]{1,8}", suffix in "[a-z]{1,8}") {
            let key = format!("{prefix}/{suffix}");
            proptest::prop_assert!(validate_key(&key).is_err());
        }
    }
}
