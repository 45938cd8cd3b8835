//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key cannot be used as a blob name.
    #[error("invalid blob key: {0:?}")]
    InvalidKey(String),

    /// Another process holds the store directory.
    #[error("store directory is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    /// The stored blob is corrupted.
    #[error("blob corrupted: {0}")]
    Corrupted(String),

    /// Encryption or decryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),
}
