//! Error types for the sync engine.

use resync_net::ClassifiedError;
use resync_storage::StorageError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the queue and coordinator.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The persistence collaborator failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A snapshot could not be encoded.
    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The snapshot was written by an unknown format version.
    #[error("unsupported snapshot version: {found} (expected {expected})")]
    UnsupportedSnapshotVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// A task must name its entity.
    #[error("entity name must not be empty")]
    EmptyEntity,

    /// A request to the remote store failed.
    #[error("request failed: {0}")]
    Request(#[from] ClassifiedError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_net::Failure;

    #[test]
    fn error_display() {
        let err = EngineError::UnsupportedSnapshotVersion {
            found: 9,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported snapshot version: 9 (expected 1)"
        );

        let err = EngineError::from(ClassifiedError::from(Failure::status(401, "Unauthorized")));
        assert!(err.to_string().contains("auth"));
    }
}
