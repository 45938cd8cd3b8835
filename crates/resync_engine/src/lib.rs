//! # resync Engine
//!
//! Offline-first sync engine: a durable queue of pending mutations and a
//! coordinator that replays them against a remote data store once the
//! network allows.
//!
//! This crate provides:
//! - [`SyncTaskQueue`] - the persisted task queue with FIFO replay order
//! - [`SyncCoordinator`] - single-flight sync cycles with per-entity ordering
//! - [`SyncWorker`] - the background loop that decides when cycles run
//! - [`DataStoreTransport`] - the seam to the remote store
//!
//! ## Key Invariants
//!
//! - A task is sent to the remote store at most `max_attempts` times
//! - Tasks of one entity are replayed strictly in insertion order
//! - At most one sync cycle runs at a time; extra triggers are skipped
//! - A completed task never appears in the pending set again
//! - Every queue mutation is persisted before it returns
//!
//! ## Example
//!
//! ```rust,no_run
//! use resync_engine::{
//!     MockTransport, Operation, Payload, SyncConfig, SyncCoordinator, SyncTaskQueue,
//!     TaskOptions,
//! };
//! use resync_net::RequestExecutor;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = SyncCoordinator::new(
//!     Arc::new(SyncTaskQueue::in_memory()),
//!     Arc::new(MockTransport::new()),
//!     Arc::new(RequestExecutor::default()),
//!     SyncConfig::default(),
//! );
//! coordinator.enqueue(
//!     "members",
//!     Operation::Create,
//!     Payload::from_json(&serde_json::json!({"name": "Ada"}))?,
//!     TaskOptions::default(),
//! )?;
//! let result = coordinator.sync_now().await;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod queue;
mod store;
mod task;
mod transport;
mod trigger;
mod worker;

pub use config::SyncConfig;
pub use coordinator::{SkipReason, SyncCoordinator, SyncCycleResult, SyncEvent, SyncStats};
pub use error::{EngineError, EngineResult};
pub use queue::{QueueStats, SyncTaskQueue};
pub use store::{Snapshot, TaskStore, DEFAULT_SNAPSHOT_KEY, SNAPSHOT_VERSION};
pub use task::{
    Operation, Payload, SyncTask, TaskId, TaskOptions, TaskState, DEFAULT_MAX_ATTEMPTS,
};
pub use transport::{send, DataStoreTransport, MockTransport, TransportCall};
pub use trigger::{BackgroundTrigger, MockBackgroundTrigger, BACKGROUND_SYNC_TAG};
pub use worker::{SyncWorker, SyncWorkerHandle};
