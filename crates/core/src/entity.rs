//! EntityRef - opaque reference to a stateful entity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a domain entity by declared type and opaque id.
///
/// The id is immutable and never interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    /// Create a new entity reference
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let entity = EntityRef::new("investment", "INV-001");
        assert_eq!(entity.to_string(), "investment:INV-001");
    }

    #[test]
    fn test_serde_round_trip() {
        let entity = EntityRef::new("company", "CMP-042");
        let json = serde_json::to_string(&entity).unwrap();
        let parsed: EntityRef = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entity);
    }
}
