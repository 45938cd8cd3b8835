//! Failure classification.
//!
//! Every failed outbound call is reduced to a [`Failure`] and classified
//! into an [`ErrorKind`] plus a retryable flag. The same rules drive
//! request-level retry and task-level failure handling.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed taxonomy of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The remote could not be reached at all.
    Network,
    /// The call did not complete in time.
    Timeout,
    /// The remote rejected our credentials.
    Auth,
    /// The remote answered with an error status.
    Server,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Returns the lowercase name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Auth => "auth",
            ErrorKind::Server => "server",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw failure as reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The call completed with an unsuccessful status.
    Status {
        /// Status code; 0 means no response was received.
        code: u16,
        /// Status text or response summary.
        text: String,
    },
    /// Connection refused or reset, DNS failure, unreachable host.
    Connect(String),
    /// The call timed out or was cancelled.
    Timeout,
    /// Any other failure.
    Other(String),
}

impl Failure {
    /// Creates a status failure.
    pub fn status(code: u16, text: impl Into<String>) -> Self {
        Self::Status {
            code,
            text: text.into(),
        }
    }

    /// Creates a connection failure.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    /// Creates an unclassified failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns the status code, if the failure carries one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Failure::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Status { code, text } if text.is_empty() => write!(f, "HTTP {code}"),
            Failure::Status { code, text } => write!(f, "HTTP {code}: {text}"),
            Failure::Connect(msg) => write!(f, "connection failed: {msg}"),
            Failure::Timeout => f.write_str("request timed out"),
            Failure::Other(msg) => f.write_str(msg),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Failure::Timeout
        } else if err.is_connect() {
            Failure::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            Failure::Status {
                code: status.as_u16(),
                text: status.canonical_reason().unwrap_or_default().to_string(),
            }
        } else {
            Failure::Other(err.to_string())
        }
    }
}

/// Result of classifying a [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// The failure kind.
    pub kind: ErrorKind,
    /// Whether repeating the call may succeed.
    pub retryable: bool,
}

/// Classifies a failure.
///
/// | Failure                    | Kind      | Retryable |
/// |----------------------------|-----------|-----------|
/// | status 0, `Connect`        | `Network` | yes       |
/// | status 401, 403            | `Auth`    | no        |
/// | other status 400..500      | `Server`  | no        |
/// | status >= 500              | `Server`  | yes       |
/// | `Timeout`                  | `Timeout` | yes       |
/// | anything else              | `Unknown` | no        |
#[must_use]
pub fn classify(failure: &Failure) -> Classification {
    let (kind, retryable) = match failure {
        Failure::Connect(_) | Failure::Status { code: 0, .. } => (ErrorKind::Network, true),
        Failure::Status {
            code: 401 | 403, ..
        } => (ErrorKind::Auth, false),
        Failure::Status {
            code: 400..=499, ..
        } => (ErrorKind::Server, false),
        Failure::Status { code: 500.., .. } => (ErrorKind::Server, true),
        Failure::Timeout => (ErrorKind::Timeout, true),
        Failure::Status { .. } | Failure::Other(_) => (ErrorKind::Unknown, false),
    };
    Classification { kind, retryable }
}

/// A classified failure, as returned by the request executor and recorded
/// on failed sync tasks.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} error: {message}")]
pub struct ClassifiedError {
    /// The failure kind.
    pub kind: ErrorKind,
    /// Whether repeating the call may succeed.
    pub retryable: bool,
    /// Status code, if the failure carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Human-readable description.
    pub message: String,
}

impl ClassifiedError {
    /// Classifies a failure and captures its description.
    #[must_use]
    pub fn from_failure(failure: &Failure) -> Self {
        let Classification { kind, retryable } = classify(failure);
        Self {
            kind,
            retryable,
            status: failure.status_code(),
            message: failure.to_string(),
        }
    }

    /// Returns true if repeating the call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<Failure> for ClassifiedError {
    fn from(failure: Failure) -> Self {
        Self::from_failure(&failure)
    }
}
