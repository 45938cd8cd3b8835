//! # resync Testkit
//!
//! Test utilities for resync.
//!
//! This crate provides:
//! - Queue fixtures backed by temporary directories
//! - A blob store that fails on demand, for durability tests
//! - A scripted transport that records call order and concurrency
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resync_testkit::prelude::*;
//!
//! #[test]
//! fn survives_restart() {
//!     let fixture = TestQueue::file();
//!     // ... enqueue, then fixture.reopen()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::transport::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use transport::*;
