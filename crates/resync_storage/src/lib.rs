//! # resync Storage
//!
//! Blob store trait and implementations for resync.
//!
//! This crate provides the persistence collaborator used by the task queue.
//! Blob stores are **opaque key-value byte stores** - they do not interpret
//! the snapshots they hold.
//!
//! ## Design Principles
//!
//! - A write fully replaces the blob under its key, or fails without
//!   touching the previous value
//! - No knowledge of task snapshots, queue state, or sync semantics
//! - Must be `Send + Sync` so a store can be shared behind an `Arc`
//!
//! ## Available Stores
//!
//! - [`InMemoryBlobStore`] - For testing and ephemeral queues
//! - [`FileBlobStore`] - One file per key, atomic write-then-rename
//! - [`EncryptedBlobStore`] - Wrapper that adds AES-256-GCM encryption
//!
//! ## Example
//!
//! ```rust
//! use resync_storage::{BlobStore, InMemoryBlobStore};
//!
//! let store = InMemoryBlobStore::new();
//! store.write_blob("sync_tasks", b"[]").unwrap();
//! assert_eq!(store.read_blob("sync_tasks").unwrap(), Some(b"[]".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod encrypted;
mod error;
mod file;
mod memory;

pub use backend::{validate_key, BlobStore};
pub use encrypted::{EncryptedBlobStore, EncryptionKey, KEY_SIZE, NONCE_SIZE};
pub use error::{StorageError, StorageResult};
pub use file::FileBlobStore;
pub use memory::InMemoryBlobStore;
