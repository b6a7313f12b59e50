//! Persistence contract for transitions
//!
//! The store is the collaborator seam: a relational database in
//! production, an in-memory store in tests. `commit_transition` is the
//! single atomic unit - state write, audit event, and optional snapshot
//! land together or not at all, and the commit carries the expected
//! current state for the optimistic-concurrency check.

use crate::error::PersistenceError;
use std::collections::HashMap;
use tokio::sync::Mutex;
use veritrail_audit::AuditEvent;
use veritrail_core::EntityRef;
use veritrail_snapshot::Snapshot;

/// One atomic transition commit
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    /// Entity being transitioned
    pub entity: EntityRef,
    /// Name of the state field
    pub field: String,
    /// State the entity must still be in for the commit to apply
    pub expected_state: String,
    /// State being written
    pub new_state: String,
    /// The single audit event describing the transition
    pub event: AuditEvent,
    /// Snapshot to persist in the same transaction, if the transition
    /// triggers one
    pub snapshot: Option<Snapshot>,
}

/// Durable storage for entity state, audit events, and snapshots
#[async_trait::async_trait]
pub trait TransitionStore: Send + Sync {
    /// Read the entity's current state
    async fn load_state(&self, entity: &EntityRef) -> Result<String, PersistenceError>;

    /// Atomically apply a validated transition.
    ///
    /// Fails with `Conflict` if the entity's state no longer equals
    /// `expected_state`; on any failure neither the state change, the
    /// audit event, nor the snapshot may be visible afterwards.
    async fn commit_transition(&self, commit: TransitionCommit) -> Result<(), PersistenceError>;

    /// Append a secondary audit event outside any primary transaction
    async fn append_event(&self, event: AuditEvent) -> Result<(), PersistenceError>;
}

#[derive(Default)]
struct MemoryStoreInner {
    states: HashMap<EntityRef, String>,
    events: Vec<AuditEvent>,
    snapshots: Vec<Snapshot>,
}

/// In-memory reference store (tests and examples)
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entity's state
    pub async fn put_state(&self, entity: EntityRef, state: impl Into<String>) {
        self.inner.lock().await.states.insert(entity, state.into());
    }

    /// Read an entity's state, if present
    pub async fn state(&self, entity: &EntityRef) -> Option<String> {
        self.inner.lock().await.states.get(entity).cloned()
    }

    /// All appended audit events, in append order
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().await.events.clone()
    }

    /// All persisted snapshots, in append order
    pub async fn snapshots(&self) -> Vec<Snapshot> {
        self.inner.lock().await.snapshots.clone()
    }
}

#[async_trait::async_trait]
impl TransitionStore for MemoryStore {
    async fn load_state(&self, entity: &EntityRef) -> Result<String, PersistenceError> {
        self.inner
            .lock()
            .await
            .states
            .get(entity)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(entity.to_string()))
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock().await;

        let current = inner
            .states
            .get(&commit.entity)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(commit.entity.to_string()))?;

        if current != commit.expected_state {
            return Err(PersistenceError::Conflict {
                expected: commit.expected_state,
                found: current,
            });
        }

        inner.states.insert(commit.entity, commit.new_state);
        inner.events.push(commit.event);
        if let Some(snapshot) = commit.snapshot {
            inner.snapshots.push(snapshot);
        }

        Ok(())
    }

    async fn append_event(&self, event: AuditEvent) -> Result<(), PersistenceError> {
        self.inner.lock().await.events.push(event);
        Ok(())
    }
}
