//! Encrypted blob store wrapper.
//!
//! Wraps any [`BlobStore`] with AES-256-GCM encryption at rest.
//!
//! ## Blob Format
//!
//! ```text
//! "RSE1" (4 bytes) || nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```
//!
//! The blob key is bound as associated data, so a ciphertext copied under a
//! different key fails authentication.

use crate::backend::BlobStore;
use crate::error::{StorageError, StorageResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const MAGIC: &[u8; 4] = b"RSE1";

/// Encryption key for [`EncryptedBlobStore`].
///
/// The key is zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StorageError::Encryption(format!(
                "invalid key size: expected {KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the key as a byte slice.
    ///
    /// Don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A blob store that encrypts everything it writes to an inner store.
///
/// # Example
///
/// ```rust
/// use resync_storage::{BlobStore, EncryptedBlobStore, EncryptionKey, InMemoryBlobStore};
///
/// let store = EncryptedBlobStore::new(InMemoryBlobStore::new(), EncryptionKey::generate());
/// store.write_blob("sync_tasks", b"secret").unwrap();
/// assert_eq!(store.read_blob("sync_tasks").unwrap(), Some(b"secret".to_vec()));
/// ```
pub struct EncryptedBlobStore<S> {
    inner: S,
    cipher: Aes256Gcm,
}

impl<S: BlobStore> EncryptedBlobStore<S> {
    /// Wraps `inner` so that every blob is encrypted with `key`.
    #[must_use]
    pub fn new(inner: S, key: EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { inner, cipher }
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn seal(&self, key: &str, plaintext: &[u8]) -> StorageResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| StorageError::Encryption("encryption failed".to_string()))?;

        let mut sealed = Vec::with_capacity(MAGIC.len() + NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(MAGIC);
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend(ciphertext);
        Ok(sealed)
    }

    fn open(&self, key: &str, sealed: &[u8]) -> StorageResult<Vec<u8>> {
        if sealed.len() < MAGIC.len() + NONCE_SIZE + TAG_SIZE || !sealed.starts_with(MAGIC) {
            return Err(StorageError::Corrupted(format!(
                "blob {key:?} is not an encrypted blob"
            )));
        }

        let body = &sealed[MAGIC.len()..];
        let (nonce, ciphertext) = body.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| StorageError::Encryption(format!("cannot decrypt blob {key:?}")))
    }
}

impl<S: BlobStore> BlobStore for EncryptedBlobStore<S> {
    fn read_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        match self.inner.read_blob(key)? {
            Some(sealed) => self.open(key, &sealed).map(Some),
            None => Ok(None),
        }
    }

    fn write_blob(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let sealed = self.seal(key, data)?;
        self.inner.write_blob(key, &sealed)
    }

    fn remove_blob(&self, key: &str) -> StorageResult<bool> {
        self.inner.remove_blob(key)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for EncryptedBlobStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedBlobStore")
            .field("inner", &self.inner)
            .field("cipher", &"Aes256Gcm")
            .finish()
    }
}
