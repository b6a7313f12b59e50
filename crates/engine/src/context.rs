//! Transition context - data passed to hooks and snapshot assemblers
//!
//! The actor is an explicit field: nothing in the pipeline reads ambient
//! "current user" state, so every path is testable with a plain value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use veritrail_core::{ActorRef, EntityRef};

/// Context for one validated transition attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionContext {
    /// The entity being transitioned
    pub entity: EntityRef,
    /// Transition name
    pub transition: String,
    /// State being left
    pub from: String,
    /// State being entered
    pub to: String,
    /// Acting principal
    pub actor: ActorRef,
    /// Timestamp of the attempt (UTC)
    pub occurred_at: DateTime<Utc>,
    /// Caller-supplied metadata, copied onto the audit event
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_serialization() {
        let ctx = TransitionContext {
            entity: EntityRef::new("investment", "INV-001"),
            transition: "complete".to_string(),
            from: "pending".to_string(),
            to: "completed".to_string(),
            actor: ActorRef::user("USR-1"),
            occurred_at: Utc::now(),
            metadata: BTreeMap::new(),
        };

        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("INV-001"));

        let parsed: TransitionContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.transition, "complete");
        assert_eq!(parsed.actor, ctx.actor);
    }
}
