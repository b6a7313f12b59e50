//! ActorRef - the acting principal behind a change
//!
//! Every audited operation records who performed it. An unauthenticated
//! caller is recorded as the `System` sentinel, which is itself part of
//! the audit record and is never coerced to null.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Concrete type of an authenticated principal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActorKind {
    /// End user (investor)
    User,
    /// Back-office administrator
    Admin,
    /// Automated service principal
    Service,
}

/// The acting principal for an audited operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "actor_type", rename_all = "snake_case")]
pub enum ActorRef {
    /// An authenticated principal with id and concrete type
    Authenticated { id: String, kind: ActorKind },
    /// Sentinel for unauthenticated or internal operations
    System,
}

impl ActorRef {
    /// Create an authenticated user actor
    pub fn user(id: impl Into<String>) -> Self {
        ActorRef::Authenticated {
            id: id.into(),
            kind: ActorKind::User,
        }
    }

    /// Create an authenticated admin actor
    pub fn admin(id: impl Into<String>) -> Self {
        ActorRef::Authenticated {
            id: id.into(),
            kind: ActorKind::Admin,
        }
    }

    /// Create an authenticated service actor
    pub fn service(id: impl Into<String>) -> Self {
        ActorRef::Authenticated {
            id: id.into(),
            kind: ActorKind::Service,
        }
    }

    /// Check if this is the System sentinel
    pub fn is_system(&self) -> bool {
        matches!(self, ActorRef::System)
    }

    /// Id recorded in the audit trail ("System" for the sentinel)
    pub fn audit_id(&self) -> &str {
        match self {
            ActorRef::Authenticated { id, .. } => id,
            ActorRef::System => "System",
        }
    }

    /// Kind recorded in the audit trail (None for the sentinel)
    pub fn kind(&self) -> Option<ActorKind> {
        match self {
            ActorRef::Authenticated { kind, .. } => Some(*kind),
            ActorRef::System => None,
        }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRef::Authenticated { id, kind } => write!(f, "{}:{}", kind, id),
            ActorRef::System => write!(f, "System"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_actor() {
        let actor = ActorRef::user("USR-001");
        assert!(!actor.is_system());
        assert_eq!(actor.audit_id(), "USR-001");
        assert_eq!(actor.kind(), Some(ActorKind::User));
        assert_eq!(actor.to_string(), "user:USR-001");
    }

    #[test]
    fn test_system_sentinel() {
        let actor = ActorRef::System;
        assert!(actor.is_system());
        assert_eq!(actor.audit_id(), "System");
        assert_eq!(actor.kind(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let actor = ActorRef::admin("ADM-7");
        let json = serde_json::to_string(&actor).unwrap();
        assert!(json.contains("authenticated"));
        assert!(json.contains("admin"));

        let parsed: ActorRef = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, actor);

        let system: ActorRef = serde_json::from_str(r#"{"actor_type":"system"}"#).unwrap();
        assert!(system.is_system());
    }
}
