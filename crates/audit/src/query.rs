//! Audit history filters
//!
//! One filter value object shared by the JSONL reader and the SQLite index,
//! so both paths answer history questions identically. Default ordering is
//! reverse-chronological.

use crate::event::AuditEvent;
use serde::{Deserialize, Serialize};

/// Filter for audit history queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Restrict to one entity type
    pub entity_type: Option<String>,
    /// Restrict to one entity id
    pub entity_id: Option<String>,
    /// Restrict to events touching this field
    pub field: Option<String>,
    /// Restrict to actions starting with this prefix (e.g. `state.`)
    pub action_prefix: Option<String>,
    /// Restrict to one actor's audit id
    pub actor_id: Option<String>,
    /// Page size (None = unbounded)
    pub limit: Option<usize>,
    /// Events to skip before the page starts
    pub offset: usize,
}

impl AuditQuery {
    /// Empty filter - everything, newest first
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter to one entity
    pub fn for_entity(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            entity_id: Some(entity_id.into()),
            ..Self::default()
        }
    }

    /// Restrict to events touching a field
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Restrict to an action-name prefix
    pub fn with_action_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.action_prefix = Some(prefix.into());
        self
    }

    /// Restrict to one actor
    pub fn by_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Paginate the result
    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Whether an event passes the filter
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(ref entity_type) = self.entity_type {
            if event.entity_type != *entity_type {
                return false;
            }
        }
        if let Some(ref entity_id) = self.entity_id {
            if event.entity_id != *entity_id {
                return false;
            }
        }
        if let Some(ref field) = self.field {
            if !event.changed_fields().contains(field.as_str()) {
                return false;
            }
        }
        if let Some(ref prefix) = self.action_prefix {
            if !event.action.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(ref actor_id) = self.actor_id {
            if event.actor.audit_id() != actor_id {
                return false;
            }
        }
        true
    }

    /// Apply the filter to an unordered batch of events.
    ///
    /// Sorts newest-first (ties broken by id for a stable order), then
    /// applies offset and limit.
    pub fn apply(&self, mut events: Vec<AuditEvent>) -> Vec<AuditEvent> {
        events.retain(|event| self.matches(event));
        events.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        events
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
