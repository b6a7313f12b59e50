//! Engine errors
//!
//! Primary-path failures (validation, veto, snapshot assembly, the atomic
//! commit) always propagate. Secondary audit-append failures never reach
//! here - the executor logs and counts them instead.

use crate::hooks::HookError;
use thiserror::Error;
use veritrail_machine::MachineError;
use veritrail_snapshot::SnapshotError;

/// Errors from the transition pipeline
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration or validation failure from the state machine
    #[error(transparent)]
    Machine(#[from] MachineError),

    /// A pre-transition hook vetoed the move; nothing was written
    #[error("transition vetoed by hook '{hook}': {reason}")]
    Vetoed { hook: String, reason: String },

    /// A pre-transition hook failed; fail closed, nothing was written
    #[error("pre-transition hook '{hook}' failed: {source}")]
    HookFailed {
        hook: String,
        #[source]
        source: HookError,
    },

    /// Snapshot assembly or capture failed; nothing was written
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The atomic commit failed; state and audit event both rolled back
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Storage-layer failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Bounded timeout expired before the store answered
    #[error("store timeout after {0}ms")]
    Timeout(u64),

    /// Optimistic-concurrency check failed: another writer got there first
    #[error("conflict: expected state '{expected}', found '{found}'")]
    Conflict { expected: String, found: String },

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_error_passes_through() {
        let err: EngineError = MachineError::Configuration("widget".to_string()).into();
        assert!(err.to_string().contains("widget"));
    }

    #[test]
    fn test_veto_names_hook() {
        let err = EngineError::Vetoed {
            hook: "kyc_check".to_string(),
            reason: "KYC incomplete".to_string(),
        };
        assert!(err.to_string().contains("kyc_check"));
        assert!(err.to_string().contains("KYC incomplete"));
    }

    #[test]
    fn test_conflict_names_both_states() {
        let err = PersistenceError::Conflict {
            expected: "pending".to_string(),
            found: "completed".to_string(),
        };
        assert!(err.to_string().contains("pending"));
        assert!(err.to_string().contains("completed"));
    }
}
