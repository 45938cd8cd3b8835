//! # resync Net
//!
//! Connectivity and request resilience for resync.
//!
//! This crate provides:
//! - Failure classification into a closed taxonomy (`Network`, `Timeout`,
//!   `Auth`, `Server`, `Unknown`)
//! - A connectivity probe grading the link as excellent/good/poor/offline
//! - A request executor wrapping every outbound call with a timeout and
//!   capped exponential backoff
//! - Connectivity event sources (manual and periodically probed)
//!
//! ## Key Invariants
//!
//! - Classification is total and pure
//! - The probe never fails; unreachable endpoints are reported, not raised
//! - A request is attempted at most `max_attempts` times
//! - A timed-out request is never retried within the same call
//!
//! ## Example
//!
//! ```rust
//! use resync_net::{classify, ErrorKind, Failure};
//!
//! let c = classify(&Failure::status(503, "Service Unavailable"));
//! assert_eq!(c.kind, ErrorKind::Server);
//! assert!(c.retryable);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod config;
mod events;
mod executor;
#[cfg(feature = "http")]
mod http;
mod monitor;
mod probe;

use std::future::Future;
use std::pin::Pin;

pub use classify::{classify, Classification, ClassifiedError, ErrorKind, Failure};
pub use config::{MonitorConfig, ProbeConfig, RetryPolicy, MIN_PROBE_INTERVAL};
pub use events::{ConnectivityEvent, ConnectivityEventSource, ManualConnectivity};
pub use executor::{RequestDiagnostics, RequestExecutor};
#[cfg(feature = "http")]
pub use http::ReqwestProber;
pub use monitor::ConnectivityMonitor;
pub use probe::{
    AlwaysOnline, BackendStatus, ConnectionQuality, ConnectivityDiagnostics, ConnectivityProbe,
    HttpProber, NetworkAdapter,
};

/// A boxed future for object-safe async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
