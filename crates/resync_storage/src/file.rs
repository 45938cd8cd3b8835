//! File-based blob store for persistent storage.
//!
//! Directory layout:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! ├─ <key>             # One file per blob
//! └─ <key>.tmp         # Transient, only during a write
//! ```

use crate::backend::{validate_key, BlobStore};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const TEMP_SUFFIX: &str = "tmp";

/// A file-based blob store.
///
/// Each key maps to one file in the store directory. Blobs survive process
/// restarts.
///
/// # Durability
///
/// Writes use the write-then-rename pattern:
/// 1. Write to `<key>.tmp`
/// 2. Sync the temporary file to disk
/// 3. Rename it over `<key>`
/// 4. Fsync the directory so the rename is durable
///
/// A crash at any step leaves either the old or the new blob, never a torn one.
///
/// # Thread Safety
///
/// The store holds an exclusive advisory lock on its directory, so only one
/// process can use it at a time. Within the process, writes are serialized.
///
/// # Example
///
/// ```no_run
/// use resync_storage::{BlobStore, FileBlobStore};
/// use std::path::Path;
///
/// let store = FileBlobStore::open(Path::new("queue")).unwrap();
/// store.write_blob("sync_tasks", b"{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBlobStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    _lock_file: File,
}

impl FileBlobStore {
    /// Opens or creates a blob store in the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - Another process holds the lock (returns [`StorageError::Locked`])
    /// - I/O errors occur
    pub fn open(path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(path.to_path_buf()));
        }
        tracing::debug!(path = %path.display(), "opened blob store");

        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.path.join(key)
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{key}.{TEMP_SUFFIX}"))
    }

    /// Syncs the store directory so renames and deletions are durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        let dir = File::open(&self.path)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced.
        Ok(())
    }
}

impl BlobStore for FileBlobStore {
    fn read_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;

        let mut file = match File::open(self.blob_path(key)) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    fn write_blob(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock();

        let temp_path = self.temp_path(key);
        let result = (|| -> StorageResult<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
            drop(file);

            fs::rename(&temp_path, self.blob_path(key))?;
            self.sync_directory()
        })();

        if let Err(e) = &result {
            tracing::warn!(key, error = %e, "blob write failed, previous blob kept");
            // Best effort: the previous blob is untouched either way.
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn remove_blob(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let _guard = self.write_lock.lock();

        match fs::remove_file(self.blob_path(key)) {
            Ok(()) => {
                self.sync_directory()?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue");

        let store = FileBlobStore::open(&path).unwrap();
        assert!(path.join(LOCK_FILE).exists());
        assert_eq!(store.read_blob("sync_tasks").unwrap(), None);
    }

    #[test]
    fn file_write_and_read() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();

        store.write_blob("sync_tasks", b"hello").unwrap();
        assert_eq!(store.read_blob("sync_tasks").unwrap(), Some(b"hello".to_vec()));

        store.write_blob("sync_tasks", b"hello world").unwrap();
        assert_eq!(
            store.read_blob("sync_tasks").unwrap(),
            Some(b"hello world".to_vec())
        );
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();

        {
            let store = FileBlobStore::open(dir.path()).unwrap();
            store.write_blob("sync_tasks", b"persistent data").unwrap();
        }

        {
            let store = FileBlobStore::open(dir.path()).unwrap();
            assert_eq!(
                store.read_blob("sync_tasks").unwrap(),
                Some(b"persistent data".to_vec())
            );
        }
    }

    #[test]
    fn file_no_temp_left_behind() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();

        store.write_blob("sync_tasks", b"data").unwrap();
        assert!(!dir.path().join("sync_tasks.tmp").exists());
    }

    #[test]
    fn file_stale_temp_does_not_shadow_blob() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        store.write_blob("sync_tasks", b"committed").unwrap();

        // Simulates a crash between writing the temp file and the rename.
        fs::write(dir.path().join("sync_tasks.tmp"), b"half-writ").unwrap();

        assert_eq!(
            store.read_blob("sync_tasks").unwrap(),
            Some(b"committed".to_vec())
        );
    }

    #[test]
    fn file_remove() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();

        store.write_blob("k", b"x").unwrap();
        assert!(store.remove_blob("k").unwrap());
        assert!(!store.remove_blob("k").unwrap());
        assert_eq!(store.read_blob("k").unwrap(), None);
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = FileBlobStore::open(dir.path()).unwrap();

        let second = FileBlobStore::open(dir.path());
        assert!(matches!(second, Err(StorageError::Locked(_))));
    }

    #[test]
    fn file_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        {
            let _store = FileBlobStore::open(dir.path()).unwrap();
        }
        assert!(FileBlobStore::open(dir.path()).is_ok());
    }

    #[test]
    fn file_rejects_bad_key() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.write_blob("../outside", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn file_path() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        assert_eq!(store.path(), dir.path());
    }
}
