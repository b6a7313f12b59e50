//! AuditEvent - immutable record of a change
//!
//! Created once, never updated or deleted. Field-level changes are carried
//! as old/new value maps; entity-level events (state transitions, captures)
//! use the action name and description.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;
use veritrail_core::{ActorRef, EntityRef};

/// Immutable audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event id (`EVT-` prefixed)
    pub id: String,
    /// When the change occurred (UTC)
    pub occurred_at: DateTime<Utc>,
    /// Who made the change - authenticated principal or the System sentinel
    pub actor: ActorRef,
    /// Declared type of the changed entity
    pub entity_type: String,
    /// Opaque id of the changed entity
    pub entity_id: String,
    /// Action name, dot-namespaced (e.g. `state.approve`, `fields.updated`)
    pub action: String,
    /// Originating module (e.g. `investments`, `companies`)
    pub module: String,
    /// Field values before the change
    pub old_values: BTreeMap<String, serde_json::Value>,
    /// Field values after the change
    pub new_values: BTreeMap<String, serde_json::Value>,
    /// Human-readable description
    pub description: String,
    /// Free-form metadata
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Id of the event this one corrects, if any
    pub corrects: Option<String>,
}

impl AuditEvent {
    /// Start building an event for an entity
    pub fn builder(
        actor: ActorRef,
        entity: &EntityRef,
        action: impl Into<String>,
        module: impl Into<String>,
    ) -> AuditEventBuilder {
        AuditEventBuilder {
            actor,
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id.clone(),
            action: action.into(),
            module: module.into(),
            old_values: BTreeMap::new(),
            new_values: BTreeMap::new(),
            description: String::new(),
            metadata: BTreeMap::new(),
            corrects: None,
        }
    }

    /// Union of fields touched by this event (old and new value keys)
    pub fn changed_fields(&self) -> BTreeSet<&str> {
        self.old_values
            .keys()
            .chain(self.new_values.keys())
            .map(String::as_str)
            .collect()
    }

    /// Whether this event corrects an earlier one
    pub fn is_correction(&self) -> bool {
        self.corrects.is_some()
    }
}

/// Builder for `AuditEvent`
pub struct AuditEventBuilder {
    actor: ActorRef,
    entity_type: String,
    entity_id: String,
    action: String,
    module: String,
    old_values: BTreeMap<String, serde_json::Value>,
    new_values: BTreeMap<String, serde_json::Value>,
    description: String,
    metadata: BTreeMap<String, serde_json::Value>,
    corrects: Option<String>,
}

impl AuditEventBuilder {
    /// Record a field's value before the change
    pub fn old_value(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.old_values.insert(field.into(), value.into());
        self
    }

    /// Record a field's value after the change
    pub fn new_value(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.new_values.insert(field.into(), value.into());
        self
    }

    /// Set the human-readable description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach a metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach several metadata entries
    pub fn metadata_map(mut self, entries: BTreeMap<String, serde_json::Value>) -> Self {
        self.metadata.extend(entries);
        self
    }

    /// Mark this event as a correction of an earlier one
    pub fn corrects(mut self, event_id: impl Into<String>) -> Self {
        self.corrects = Some(event_id.into());
        self
    }

    /// Finalize the event with a fresh id and timestamp
    pub fn build(self) -> AuditEvent {
        self.build_at(Utc::now())
    }

    /// Finalize the event with an explicit timestamp
    pub fn build_at(self, occurred_at: DateTime<Utc>) -> AuditEvent {
        AuditEvent {
            id: format!("EVT-{}", Uuid::new_v4()),
            occurred_at,
            actor: self.actor,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: self.action,
            module: self.module,
            old_values: self.old_values,
            new_values: self.new_values,
            description: self.description,
            metadata: self.metadata,
            corrects: self.corrects,
        }
    }
}
