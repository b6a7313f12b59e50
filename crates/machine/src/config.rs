//! State machine declarations - deploy-time configuration values
//!
//! A `StateConfig` is declared once per entity type and validated at
//! construction: every transition endpoint must be a member of the
//! declared state set, so malformed declarations fail at startup rather
//! than mid-transition.

use crate::error::MachineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A named, declared state-to-state move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDef {
    /// Transition name, unique within the config
    pub name: String,
    /// States the transition is legal from
    pub from: BTreeSet<String>,
    /// Resulting state
    pub to: String,
    /// Human-readable label for presentation collaborators
    pub label: String,
}

/// Static state machine declaration for one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    field: String,
    states: BTreeSet<String>,
    transitions: BTreeMap<String, TransitionDef>,
}

impl StateConfig {
    /// Start building a config for the given state field
    pub fn builder(field: impl Into<String>) -> StateConfigBuilder {
        StateConfigBuilder {
            field: field.into(),
            states: BTreeSet::new(),
            transitions: Vec::new(),
        }
    }

    /// Name of the entity's state field
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The bounded state enumeration
    pub fn states(&self) -> &BTreeSet<String> {
        &self.states
    }

    /// Check membership in the declared state set
    pub fn has_state(&self, state: &str) -> bool {
        self.states.contains(state)
    }

    /// Look up a transition by name
    pub fn transition(&self, name: &str) -> Option<&TransitionDef> {
        self.transitions.get(name)
    }

    /// All declared transitions, in name order
    pub fn transitions(&self) -> impl Iterator<Item = &TransitionDef> {
        self.transitions.values()
    }
}

/// Builder for `StateConfig`
pub struct StateConfigBuilder {
    field: String,
    states: BTreeSet<String>,
    transitions: Vec<TransitionDef>,
}

impl StateConfigBuilder {
    /// Declare an allowed state
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.states.insert(state.into());
        self
    }

    /// Declare several allowed states
    pub fn states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states.extend(states.into_iter().map(Into::into));
        self
    }

    /// Declare a transition with a default label equal to its name
    pub fn transition<I, S>(self, name: impl Into<String>, from: I, to: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let label = name.clone();
        self.labeled_transition(name, from, to, label)
    }

    /// Declare a transition with an explicit presentation label
    pub fn labeled_transition<I, S>(
        mut self,
        name: impl Into<String>,
        from: I,
        to: impl Into<String>,
        label: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transitions.push(TransitionDef {
            name: name.into(),
            from: from.into_iter().map(Into::into).collect(),
            to: to.into(),
            label: label.into(),
        });
        self
    }

    /// Validate and produce the config.
    ///
    /// Fails if the state set is empty, a transition name repeats, or any
    /// transition endpoint is outside the declared state set.
    pub fn build(self) -> Result<StateConfig, MachineError> {
        if self.states.is_empty() {
            return Err(MachineError::MalformedConfig {
                field: self.field,
                reason: "empty state set".to_string(),
            });
        }

        let mut transitions = BTreeMap::new();
        for def in self.transitions {
            if def.from.is_empty() {
                return Err(MachineError::MalformedConfig {
                    field: self.field,
                    reason: format!("transition '{}' has an empty from-set", def.name),
                });
            }
            for from in &def.from {
                if !self.states.contains(from) {
                    return Err(MachineError::MalformedConfig {
                        field: self.field,
                        reason: format!(
                            "transition '{}' departs from undeclared state '{}'",
                            def.name, from
                        ),
                    });
                }
            }
            if !self.states.contains(&def.to) {
                return Err(MachineError::MalformedConfig {
                    field: self.field,
                    reason: format!(
                        "transition '{}' targets undeclared state '{}'",
                        def.name, def.to
                    ),
                });
            }
            if transitions.insert(def.name.clone(), def).is_some() {
                return Err(MachineError::MalformedConfig {
                    field: self.field,
                    reason: "duplicate transition name".to_string(),
                });
            }
        }

        Ok(StateConfig {
            field: self.field,
            states: self.states,
            transitions,
        })
    }
}
