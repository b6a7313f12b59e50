//! State machine validation - pure, side-effect free
//!
//! `plan` answers "is this move legal, and what exactly would it do" without
//! touching the entity. The engine crate performs the mutation, audit write,
//! and hooks around an approved plan.

use crate::config::StateConfig;
use crate::error::MachineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A validated transition, ready to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPlan {
    /// Transition name
    pub name: String,
    /// State the entity is leaving
    pub from: String,
    /// State the entity will enter
    pub to: String,
}

/// A transition legal from the current state, for presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTransition {
    pub name: String,
    pub to: String,
    pub label: String,
}

/// Stateless validation service parameterized by a declared config
#[derive(Debug, Clone)]
pub struct StateMachine {
    config: Arc<StateConfig>,
}

impl StateMachine {
    /// Create a machine over an owned config
    pub fn new(config: StateConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Create a machine over a shared config
    pub fn from_shared(config: Arc<StateConfig>) -> Self {
        Self { config }
    }

    /// The underlying declaration
    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Validate a transition attempt from the current state.
    ///
    /// The current state must be a member of the declared state set, the
    /// transition must exist, and the current state must be in its
    /// from-set. No side effects.
    pub fn plan(&self, current_state: &str, transition: &str) -> Result<TransitionPlan, MachineError> {
        if !self.config.has_state(current_state) {
            return Err(MachineError::UndeclaredState {
                field: self.config.field().to_string(),
                state: current_state.to_string(),
            });
        }

        let def = self.config.transition(transition).ok_or_else(|| {
            MachineError::UnknownTransition {
                name: transition.to_string(),
                from: current_state.to_string(),
            }
        })?;

        if !def.from.contains(current_state) {
            return Err(MachineError::InvalidTransition {
                name: def.name.clone(),
                from: current_state.to_string(),
                to: def.to.clone(),
            });
        }

        Ok(TransitionPlan {
            name: def.name.clone(),
            from: current_state.to_string(),
            to: def.to.clone(),
        })
    }

    /// Pure predicate: would `plan` succeed?
    pub fn can_transition(&self, current_state: &str, transition: &str) -> bool {
        self.plan(current_state, transition).is_ok()
    }

    /// All transitions legal from the current state, in name order
    pub fn available_transitions(&self, current_state: &str) -> Vec<AvailableTransition> {
        self.config
            .transitions()
            .filter(|def| def.from.contains(current_state))
            .map(|def| AvailableTransition {
                name: def.name.clone(),
                to: def.to.clone(),
                label: def.label.clone(),
            })
            .collect()
    }
}
