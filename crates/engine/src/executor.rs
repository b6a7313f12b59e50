//! Transition executor - orchestrates the full transition lifecycle
//!
//! Exactly one audit event per successful transition, zero on failure or
//! veto. Snapshot-triggering transitions commit the snapshot in the same
//! atomic unit as the state write. All store interactions are bounded by
//! a timeout; a lost optimistic-concurrency race is retried against the
//! re-read state.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;

use crate::context::TransitionContext;
use crate::error::{EngineError, EngineResult, PersistenceError};
use crate::hooks::{HookRegistry, PostTransitionHook, PreTransitionHook};
use crate::outcome::{SideEffects, TransitionOutcome};
use crate::store::{TransitionCommit, TransitionStore};
use veritrail_audit::AuditEvent;
use veritrail_core::{ActorRef, EntityRef};
use veritrail_machine::{AvailableTransition, StateConfig, StateConfigRegistry};
use veritrail_snapshot::{Snapshot, SnapshotContext, SnapshotError};

/// Assembles the snapshot context for a triggering transition.
///
/// Registered per `(entity_type, transition)` at configuration time. An
/// assembly failure aborts the whole transition before any write.
#[async_trait::async_trait]
pub trait SnapshotAssembler: Send + Sync {
    async fn assemble(&self, ctx: &TransitionContext) -> Result<SnapshotContext, SnapshotError>;
}

/// A business-action request: entity, transition, explicit actor, metadata
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub entity: EntityRef,
    pub transition: String,
    pub actor: ActorRef,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TransitionRequest {
    /// Create a request with no extra metadata
    pub fn new(entity: EntityRef, transition: impl Into<String>, actor: ActorRef) -> Self {
        Self {
            entity,
            transition: transition.into(),
            actor,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry, copied onto the audit event
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

type TriggerKey = (String, String);

/// Transition executor over a durable store
pub struct TransitionExecutor {
    configs: StateConfigRegistry,
    modules: HashMap<String, String>,
    hooks: HookRegistry,
    assemblers: HashMap<TriggerKey, Arc<dyn SnapshotAssembler>>,
    store: Arc<dyn TransitionStore>,
    store_timeout: Duration,
    max_attempts: u32,
    audit_failures: AtomicU64,
}

impl TransitionExecutor {
    /// Start building an executor over a store
    pub fn builder(store: Arc<dyn TransitionStore>) -> ExecutorBuilder {
        ExecutorBuilder::new(store)
    }

    /// Execute a transition through the full pipeline.
    ///
    /// On success the state change, its single audit event, and any
    /// triggered snapshot are committed atomically; post-transition hook
    /// failures surface as `SideEffects::Degraded` on the outcome, never
    /// as an error and never as a rollback.
    pub async fn execute(&self, request: TransitionRequest) -> EngineResult<TransitionOutcome> {
        let machine = self.configs.machine(&request.entity.entity_type)?;
        let field = machine.config().field().to_string();
        let module = self
            .modules
            .get(&request.entity.entity_type)
            .cloned()
            .unwrap_or_else(|| request.entity.entity_type.clone());

        let mut attempt = 0;
        loop {
            attempt += 1;

            let current = self.bounded(self.store.load_state(&request.entity)).await?;
            let plan = machine.plan(&current, &request.transition)?;

            let ctx = TransitionContext {
                entity: request.entity.clone(),
                transition: plan.name.clone(),
                from: plan.from.clone(),
                to: plan.to.clone(),
                actor: request.actor.clone(),
                occurred_at: Utc::now(),
                metadata: request.metadata.clone(),
            };

            // Veto or hook failure aborts before any mutation
            self.hooks.run_pre(&ctx).await?;

            // Assembly failure aborts atomically - a partial snapshot is
            // never persisted
            let trigger_key = (ctx.entity.entity_type.clone(), ctx.transition.clone());
            let snapshot = match self.assemblers.get(&trigger_key) {
                Some(assembler) => {
                    let context = assembler.assemble(&ctx).await?;
                    Some(Snapshot::capture(&ctx.entity, context, ctx.occurred_at)?)
                }
                None => None,
            };

            let snapshot_id = snapshot.as_ref().map(|snapshot| snapshot.id.clone());
            let event = self.transition_event(&ctx, &field, &module, snapshot_id.as_deref());
            let event_id = event.id.clone();

            let commit = TransitionCommit {
                entity: ctx.entity.clone(),
                field: field.clone(),
                expected_state: plan.from.clone(),
                new_state: plan.to.clone(),
                event,
                snapshot: snapshot.clone(),
            };

            match self.bounded(self.store.commit_transition(commit)).await {
                Ok(()) => {
                    tracing::debug!(
                        entity = %ctx.entity,
                        transition = %ctx.transition,
                        from = %ctx.from,
                        to = %ctx.to,
                        event_id = %event_id,
                        "Transition committed"
                    );

                    // Committed: hooks from here on cannot roll it back
                    let failures = self.hooks.run_post(&ctx).await;

                    return Ok(TransitionOutcome {
                        entity: ctx.entity,
                        transition: ctx.transition,
                        from: ctx.from,
                        to: ctx.to,
                        event_id,
                        snapshot,
                        side_effects: SideEffects::from_failures(failures),
                    });
                }
                Err(EngineError::Persistence(PersistenceError::Conflict { expected, found }))
                    if attempt < self.max_attempts =>
                {
                    tracing::warn!(
                        entity = %request.entity,
                        transition = %request.transition,
                        attempt,
                        expected = %expected,
                        found = %found,
                        "Commit lost a concurrent race, re-validating"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Pure predicate over the entity's current state, no side effects
    pub async fn can_transition(&self, entity: &EntityRef, transition: &str) -> EngineResult<bool> {
        let machine = self.configs.machine(&entity.entity_type)?;
        let current = self.bounded(self.store.load_state(entity)).await?;
        Ok(machine.can_transition(&current, transition))
    }

    /// Transitions legal from the entity's current state
    pub async fn available_transitions(
        &self,
        entity: &EntityRef,
    ) -> EngineResult<Vec<AvailableTransition>> {
        let machine = self.configs.machine(&entity.entity_type)?;
        let current = self.bounded(self.store.load_state(entity)).await?;
        Ok(machine.available_transitions(&current))
    }

    /// Append an audit event for a secondary concern.
    ///
    /// Best-effort relative to the primary operation it describes: a
    /// failure is logged to the operational channel and counted, never
    /// propagated to the caller.
    pub async fn append_secondary(&self, event: AuditEvent) {
        let event_id = event.id.clone();
        match timeout(self.store_timeout, self.store.append_event(event)).await {
            Ok(Ok(())) => {
                tracing::debug!(event_id = %event_id, "Secondary audit event appended");
            }
            Ok(Err(e)) => {
                self.audit_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    event_id = %event_id,
                    error = %e,
                    "Secondary audit append failed; primary operation unaffected"
                );
            }
            Err(_) => {
                self.audit_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    event_id = %event_id,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Secondary audit append timed out; primary operation unaffected"
                );
            }
        }
    }

    /// Observable count of dropped secondary audit appends
    pub fn audit_failure_count(&self) -> u64 {
        self.audit_failures.load(Ordering::Relaxed)
    }

    fn transition_event(
        &self,
        ctx: &TransitionContext,
        field: &str,
        module: &str,
        snapshot_id: Option<&str>,
    ) -> AuditEvent {
        let mut builder = AuditEvent::builder(
            ctx.actor.clone(),
            &ctx.entity,
            format!("state.{}", ctx.transition),
            module,
        )
        .old_value(field, ctx.from.clone())
        .new_value(field, ctx.to.clone())
        .describe(format!(
            "'{}' transition on {}: {} -> {}",
            ctx.transition, ctx.entity, ctx.from, ctx.to
        ))
        .metadata_map(ctx.metadata.clone());

        if let Some(snapshot_id) = snapshot_id {
            builder = builder.metadata("snapshot_id", snapshot_id);
        }

        builder.build_at(ctx.occurred_at)
    }

    /// Wrap a store interaction in the bounded timeout
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, PersistenceError>>,
    ) -> EngineResult<T> {
        match timeout(self.store_timeout, fut).await {
            Ok(result) => result.map_err(EngineError::Persistence),
            Err(_) => Err(EngineError::Persistence(PersistenceError::Timeout(
                self.store_timeout.as_millis() as u64,
            ))),
        }
    }
}

/// Builder for `TransitionExecutor`
pub struct ExecutorBuilder {
    configs: StateConfigRegistry,
    modules: HashMap<String, String>,
    hooks: HookRegistry,
    assemblers: HashMap<TriggerKey, Arc<dyn SnapshotAssembler>>,
    store: Arc<dyn TransitionStore>,
    store_timeout: Duration,
    max_attempts: u32,
}

impl ExecutorBuilder {
    /// Create a builder with default timeout (5s) and retry bound (3)
    pub fn new(store: Arc<dyn TransitionStore>) -> Self {
        Self {
            configs: StateConfigRegistry::new(),
            modules: HashMap::new(),
            hooks: HookRegistry::new(),
            assemblers: HashMap::new(),
            store,
            store_timeout: Duration::from_secs(5),
            max_attempts: 3,
        }
    }

    /// Declare an entity type's state machine and originating module
    pub fn declare(
        mut self,
        entity_type: impl Into<String>,
        module: impl Into<String>,
        config: StateConfig,
    ) -> Self {
        let entity_type = entity_type.into();
        self.modules.insert(entity_type.clone(), module.into());
        self.configs.declare(entity_type, config);
        self
    }

    /// Register a pre-transition hook
    pub fn pre_hook(
        mut self,
        entity_type: impl Into<String>,
        transition: impl Into<String>,
        hook: Arc<dyn PreTransitionHook>,
    ) -> Self {
        self.hooks.register_pre(entity_type, transition, hook);
        self
    }

    /// Register a post-transition hook
    pub fn post_hook(
        mut self,
        entity_type: impl Into<String>,
        transition: impl Into<String>,
        hook: Arc<dyn PostTransitionHook>,
    ) -> Self {
        self.hooks.register_post(entity_type, transition, hook);
        self
    }

    /// Mark a transition as snapshot-triggering
    pub fn snapshot_trigger(
        mut self,
        entity_type: impl Into<String>,
        transition: impl Into<String>,
        assembler: Arc<dyn SnapshotAssembler>,
    ) -> Self {
        self.assemblers
            .insert((entity_type.into(), transition.into()), assembler);
        self
    }

    /// Bound every store interaction by this timeout
    pub fn store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Total commit attempts before a conflict is surfaced
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Build the executor
    pub fn build(self) -> TransitionExecutor {
        TransitionExecutor {
            configs: self.configs,
            modules: self.modules,
            hooks: self.hooks,
            assemblers: self.assemblers,
            store: self.store,
            store_timeout: self.store_timeout,
            max_attempts: self.max_attempts,
            audit_failures: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use veritrail_machine::MachineError;

    fn investment_config() -> StateConfig {
        StateConfig::builder("status")
            .states(["pending", "approved", "rejected"])
            .transition("approve", ["pending"], "approved")
            .transition("reject", ["pending"], "rejected")
            .build()
            .unwrap()
    }

    async fn executor_with(store: Arc<MemoryStore>) -> TransitionExecutor {
        store
            .put_state(EntityRef::new("investment", "INV-001"), "pending")
            .await;
        TransitionExecutor::builder(store)
            .declare("investment", "investments", investment_config())
            .build()
    }

    #[tokio::test]
    async fn test_undeclared_type_is_configuration_error() {
        let store = Arc::new(MemoryStore::new());
        let executor = executor_with(store).await;

        let request = TransitionRequest::new(
            EntityRef::new("widget", "WID-001"),
            "approve",
            ActorRef::System,
        );
        let err = executor.execute(request).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Machine(MachineError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_approve_scenario_exactly_one_event() {
        let store = Arc::new(MemoryStore::new());
        let executor = executor_with(store.clone()).await;
        let entity = EntityRef::new("investment", "INV-001");

        let outcome = executor
            .execute(TransitionRequest::new(
                entity.clone(),
                "approve",
                ActorRef::admin("ADM-1"),
            ))
            .await
            .unwrap();

        assert_eq!(outcome.from, "pending");
        assert_eq!(outcome.to, "approved");
        assert_eq!(store.state(&entity).await.as_deref(), Some("approved"));

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, outcome.event_id);
        assert_eq!(events[0].old_values["status"], "pending");
        assert_eq!(events[0].new_values["status"], "approved");

        // Second attempt: illegal, names the (approved, approved) pair,
        // and appends nothing
        let err = executor
            .execute(TransitionRequest::new(entity.clone(), "approve", ActorRef::admin("ADM-1")))
            .await
            .unwrap_err();
        match err {
            EngineError::Machine(MachineError::InvalidTransition { from, to, .. }) => {
                assert_eq!(from, "approved");
                assert_eq!(to, "approved");
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
        assert_eq!(store.events().await.len(), 1);
        assert_eq!(store.state(&entity).await.as_deref(), Some("approved"));
    }

    #[tokio::test]
    async fn test_read_operations() {
        let store = Arc::new(MemoryStore::new());
        let executor = executor_with(store.clone()).await;
        let entity = EntityRef::new("investment", "INV-001");

        assert!(executor.can_transition(&entity, "approve").await.unwrap());
        assert!(!executor.can_transition(&entity, "missing").await.unwrap());

        let available = executor.available_transitions(&entity).await.unwrap();
        assert_eq!(available.len(), 2);

        // Reads appended nothing
        assert!(store.events().await.is_empty());
    }

    struct SlowStore;

    #[async_trait::async_trait]
    impl TransitionStore for SlowStore {
        async fn load_state(&self, _entity: &EntityRef) -> Result<String, PersistenceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("pending".to_string())
        }

        async fn commit_transition(&self, _commit: TransitionCommit) -> Result<(), PersistenceError> {
            Ok(())
        }

        async fn append_event(&self, _event: AuditEvent) -> Result<(), PersistenceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_store_timeout_fails_instead_of_hanging() {
        let executor = TransitionExecutor::builder(Arc::new(SlowStore))
            .declare("investment", "investments", investment_config())
            .store_timeout(Duration::from_millis(20))
            .build();

        let err = executor
            .execute(TransitionRequest::new(
                EntityRef::new("investment", "INV-001"),
                "approve",
                ActorRef::System,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Persistence(PersistenceError::Timeout(20))
        ));
    }

    #[tokio::test]
    async fn test_secondary_append_failure_is_counted_not_raised() {
        let executor = TransitionExecutor::builder(Arc::new(SlowStore))
            .declare("investment", "investments", investment_config())
            .store_timeout(Duration::from_millis(20))
            .build();

        let event = AuditEvent::builder(
            ActorRef::System,
            &EntityRef::new("investment", "INV-001"),
            "fields.updated",
            "investments",
        )
        .build();

        assert_eq!(executor.audit_failure_count(), 0);
        executor.append_secondary(event).await;
        assert_eq!(executor.audit_failure_count(), 1);
    }
}
