//! State machine errors

use thiserror::Error;

/// Errors from state machine declaration and validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MachineError {
    /// The entity type never declared a state machine. Programmer error.
    #[error("no state machine declared for entity type '{0}'")]
    Configuration(String),

    /// The declared config is internally inconsistent. Programmer error,
    /// raised at declaration time, never at transition time.
    #[error("state config for field '{field}' is malformed: {reason}")]
    MalformedConfig { field: String, reason: String },

    /// The entity carries a state outside its declared state set.
    #[error("state '{state}' is not in the declared state set for field '{field}'")]
    UndeclaredState { field: String, state: String },

    /// The transition name does not exist in the transition table.
    #[error("unknown transition '{name}' attempted from state '{from}'")]
    UnknownTransition { name: String, from: String },

    /// The transition exists but is not legal from the current state.
    #[error("transition '{name}' not allowed from current state '{from}' to '{to}'")]
    InvalidTransition {
        name: String,
        from: String,
        to: String,
    },
}

impl MachineError {
    /// Whether the error is recoverable caller input (an illegal transition)
    /// rather than a fatal configuration problem.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MachineError::UnknownTransition { .. } | MachineError::InvalidTransition { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_names_both_states() {
        let err = MachineError::InvalidTransition {
            name: "approve".to_string(),
            from: "approved".to_string(),
            to: "approved".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("'approved'"));
        assert!(message.contains("approve"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_configuration_not_recoverable() {
        let err = MachineError::Configuration("widget".to_string());
        assert!(!err.is_recoverable());
    }
}
