//! Snapshot errors
//!
//! `TamperDetected` is deliberately its own variant with its own severity:
//! it must never be reported as, or downgraded to, an ordinary not-found.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Context assembly failed - nothing was persisted.
    #[error("snapshot capture aborted, context incomplete: {0}")]
    IncompleteSnapshot(String),

    /// Stored content no longer matches its recorded hash.
    #[error("TAMPER DETECTED on snapshot {snapshot_id}: expected hash '{expected}', stored hash '{actual}'")]
    TamperDetected {
        snapshot_id: String,
        expected: String,
        actual: String,
    },

    /// No snapshot with the requested id.
    #[error("snapshot not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SnapshotError {
    /// Whether this is the high-visibility tamper class
    pub fn is_tamper(&self) -> bool {
        matches!(self, SnapshotError::TamperDetected { .. })
    }
}
