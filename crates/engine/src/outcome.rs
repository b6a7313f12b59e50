//! Transition outcome - what the caller gets back

use veritrail_core::EntityRef;
use veritrail_snapshot::Snapshot;

/// Status of post-commit side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffects {
    /// Every post-transition hook completed
    Completed,
    /// The transition is committed, but one or more post-transition hooks
    /// failed. The failures are reported here, never swallowed.
    Degraded { failures: Vec<String> },
}

impl SideEffects {
    /// Build from collected hook failures
    pub fn from_failures(failures: Vec<String>) -> Self {
        if failures.is_empty() {
            SideEffects::Completed
        } else {
            SideEffects::Degraded { failures }
        }
    }

    /// Whether any side effect failed
    pub fn is_degraded(&self) -> bool {
        matches!(self, SideEffects::Degraded { .. })
    }
}

/// Result of a committed transition
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// Entity that was transitioned
    pub entity: EntityRef,
    /// Transition name
    pub transition: String,
    /// State that was left
    pub from: String,
    /// State that was entered
    pub to: String,
    /// Id of the single audit event describing the transition
    pub event_id: String,
    /// Snapshot captured in the same transaction, if the transition
    /// triggers one
    pub snapshot: Option<Snapshot>,
    /// Post-commit side effect status
    pub side_effects: SideEffects,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_effects_from_failures() {
        assert_eq!(SideEffects::from_failures(vec![]), SideEffects::Completed);

        let degraded = SideEffects::from_failures(vec!["notify: timeout".to_string()]);
        assert!(degraded.is_degraded());
    }
}
