//! Registry of state machine declarations, keyed by entity type
//!
//! Populated once at startup. Resolving an undeclared entity type is a
//! `Configuration` error - a programmer mistake, not caller input.

use crate::config::StateConfig;
use crate::error::MachineError;
use crate::machine::StateMachine;
use std::collections::HashMap;
use std::sync::Arc;

/// Deploy-time registry of per-entity-type state machine declarations
#[derive(Debug, Default)]
pub struct StateConfigRegistry {
    configs: HashMap<String, Arc<StateConfig>>,
}

impl StateConfigRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the state machine for an entity type.
    ///
    /// Re-declaring a type replaces the previous declaration.
    pub fn declare(&mut self, entity_type: impl Into<String>, config: StateConfig) {
        let entity_type = entity_type.into();
        tracing::debug!(entity_type = %entity_type, field = config.field(), "State machine declared");
        self.configs.insert(entity_type, Arc::new(config));
    }

    /// Resolve the declaration for an entity type
    pub fn resolve(&self, entity_type: &str) -> Result<Arc<StateConfig>, MachineError> {
        self.configs
            .get(entity_type)
            .cloned()
            .ok_or_else(|| MachineError::Configuration(entity_type.to_string()))
    }

    /// Build a validation machine for an entity type
    pub fn machine(&self, entity_type: &str) -> Result<StateMachine, MachineError> {
        Ok(StateMachine::from_shared(self.resolve(entity_type)?))
    }

    /// Check whether a type has a declaration
    pub fn contains(&self, entity_type: &str) -> bool {
        self.configs.contains_key(entity_type)
    }

    /// Number of declared entity types
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StateConfigRegistry {
        let mut registry = StateConfigRegistry::new();
        registry.declare(
            "investment",
            StateConfig::builder("status")
                .states(["pending", "completed", "refunded"])
                .transition("complete", ["pending"], "completed")
                .transition("refund", ["completed"], "refunded")
                .build()
                .unwrap(),
        );
        registry
    }

    #[test]
    fn test_resolve_declared_type() {
        let registry = registry();
        let config = registry.resolve("investment").unwrap();
        assert_eq!(config.field(), "status");
        assert!(registry.contains("investment"));
    }

    #[test]
    fn test_resolve_undeclared_type_is_configuration_error() {
        let registry = registry();
        let err = registry.resolve("widget").unwrap_err();
        assert!(matches!(err, MachineError::Configuration(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_machine_for_type() {
        let registry = registry();
        let machine = registry.machine("investment").unwrap();
        assert!(machine.can_transition("pending", "complete"));
        assert!(!machine.can_transition("pending", "refund"));
    }
}
