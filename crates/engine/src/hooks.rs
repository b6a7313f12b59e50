//! Transition hooks - explicit callbacks registered per transition
//!
//! Hooks are declared at configuration time against a concrete
//! `(entity_type, transition)` pair and run in priority order (lower =
//! first). Pre-transition hooks can veto; a veto or failure aborts before
//! any mutation. Post-transition hooks run after the commit and can never
//! roll it back - their failures surface as a degraded-success outcome.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::TransitionContext;
use crate::error::EngineError;
use thiserror::Error;

/// Errors from hook execution
#[derive(Debug, Error)]
pub enum HookError {
    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("hook timeout after {0}ms")]
    Timeout(u64),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;

/// Decision from a pre-transition hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Allow the transition to proceed
    Proceed,
    /// Veto the transition with a reason
    Veto { reason: String },
}

impl HookDecision {
    /// Create a veto decision
    pub fn veto(reason: impl Into<String>) -> Self {
        HookDecision::Veto {
            reason: reason.into(),
        }
    }

    /// Check if this is a veto
    pub fn is_veto(&self) -> bool {
        matches!(self, HookDecision::Veto { .. })
    }
}

/// Pre-transition hook - runs BEFORE any mutation.
///
/// A veto (or a hook failure) aborts the transition: no state write, no
/// audit event, no snapshot.
#[async_trait::async_trait]
pub trait PreTransitionHook: Send + Sync {
    /// Hook name for logging and veto reporting
    fn name(&self) -> &str;

    /// Priority (lower = runs first)
    fn priority(&self) -> u32 {
        100
    }

    /// Called before the state write
    async fn on_before(&self, ctx: &TransitionContext) -> HookResult<HookDecision>;
}

/// Post-transition hook - runs AFTER the commit.
///
/// Cannot veto and is never rolled back. A failure here is reported to the
/// caller as degraded success, not swallowed.
#[async_trait::async_trait]
pub trait PostTransitionHook: Send + Sync {
    /// Hook name for logging and degraded-outcome reporting
    fn name(&self) -> &str;

    /// Priority (lower = runs first)
    fn priority(&self) -> u32 {
        100
    }

    /// Called after the transition is committed
    async fn on_after(&self, ctx: &TransitionContext) -> HookResult<()>;
}

/// A no-op pre-transition hook (for testing)
pub struct NoOpPreHook;

#[async_trait::async_trait]
impl PreTransitionHook for NoOpPreHook {
    fn name(&self) -> &str {
        "NoOpPre"
    }

    async fn on_before(&self, _ctx: &TransitionContext) -> HookResult<HookDecision> {
        Ok(HookDecision::Proceed)
    }
}

/// A no-op post-transition hook (for testing)
pub struct NoOpPostHook;

#[async_trait::async_trait]
impl PostTransitionHook for NoOpPostHook {
    fn name(&self) -> &str {
        "NoOpPost"
    }

    async fn on_after(&self, _ctx: &TransitionContext) -> HookResult<()> {
        Ok(())
    }
}

type HookKey = (String, String);

/// Registry of hooks keyed by `(entity_type, transition)`
#[derive(Default)]
pub struct HookRegistry {
    pre_hooks: HashMap<HookKey, Vec<Arc<dyn PreTransitionHook>>>,
    post_hooks: HashMap<HookKey, Vec<Arc<dyn PostTransitionHook>>>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-transition hook for a transition
    pub fn register_pre(
        &mut self,
        entity_type: impl Into<String>,
        transition: impl Into<String>,
        hook: Arc<dyn PreTransitionHook>,
    ) {
        let hooks = self
            .pre_hooks
            .entry((entity_type.into(), transition.into()))
            .or_default();
        hooks.push(hook);
        hooks.sort_by_key(|h| h.priority());
    }

    /// Register a post-transition hook for a transition
    pub fn register_post(
        &mut self,
        entity_type: impl Into<String>,
        transition: impl Into<String>,
        hook: Arc<dyn PostTransitionHook>,
    ) {
        let hooks = self
            .post_hooks
            .entry((entity_type.into(), transition.into()))
            .or_default();
        hooks.push(hook);
        hooks.sort_by_key(|h| h.priority());
    }

    /// Run the pre-transition hooks for a context.
    ///
    /// Fails closed: the first veto or hook failure aborts. Returns Ok(())
    /// only when every hook allowed the transition.
    pub async fn run_pre(&self, ctx: &TransitionContext) -> Result<(), EngineError> {
        let key = (ctx.entity.entity_type.clone(), ctx.transition.clone());
        let Some(hooks) = self.pre_hooks.get(&key) else {
            return Ok(());
        };

        for hook in hooks {
            match hook.on_before(ctx).await {
                Ok(HookDecision::Proceed) => {
                    tracing::debug!(hook = hook.name(), entity = %ctx.entity, "Pre-transition hook passed");
                }
                Ok(HookDecision::Veto { reason }) => {
                    tracing::warn!(
                        hook = hook.name(),
                        entity = %ctx.entity,
                        reason = %reason,
                        "Pre-transition hook vetoed transition"
                    );
                    return Err(EngineError::Vetoed {
                        hook: hook.name().to_string(),
                        reason,
                    });
                }
                Err(e) => {
                    tracing::error!(
                        hook = hook.name(),
                        entity = %ctx.entity,
                        error = %e,
                        "Pre-transition hook failed"
                    );
                    return Err(EngineError::HookFailed {
                        hook: hook.name().to_string(),
                        source: e,
                    });
                }
            }
        }

        Ok(())
    }

    /// Run the post-transition hooks for a committed context.
    ///
    /// Returns the failures (hook name + error) instead of erroring: the
    /// commit already happened and is never rolled back.
    pub async fn run_post(&self, ctx: &TransitionContext) -> Vec<String> {
        let key = (ctx.entity.entity_type.clone(), ctx.transition.clone());
        let Some(hooks) = self.post_hooks.get(&key) else {
            return Vec::new();
        };

        let mut failures = Vec::new();
        for hook in hooks {
            match hook.on_after(ctx).await {
                Ok(()) => {
                    tracing::debug!(hook = hook.name(), entity = %ctx.entity, "Post-transition hook completed");
                }
                Err(e) => {
                    tracing::warn!(
                        hook = hook.name(),
                        entity = %ctx.entity,
                        error = %e,
                        "Post-transition hook failed after commit"
                    );
                    failures.push(format!("{}: {}", hook.name(), e));
                }
            }
        }

        failures
    }

    /// Number of pre-transition hooks registered for a transition
    pub fn pre_hook_count(&self, entity_type: &str, transition: &str) -> usize {
        self.pre_hooks
            .get(&(entity_type.to_string(), transition.to_string()))
            .map_or(0, Vec::len)
    }

    /// Number of post-transition hooks registered for a transition
    pub fn post_hook_count(&self, entity_type: &str, transition: &str) -> usize {
        self.post_hooks
            .get(&(entity_type.to_string(), transition.to_string()))
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use veritrail_core::{ActorRef, EntityRef};

    fn ctx(transition: &str) -> TransitionContext {
        TransitionContext {
            entity: EntityRef::new("investment", "INV-001"),
            transition: transition.to_string(),
            from: "pending".to_string(),
            to: "completed".to_string(),
            actor: ActorRef::user("USR-1"),
            occurred_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    struct VetoHook {
        priority: u32,
        reason: &'static str,
    }

    #[async_trait::async_trait]
    impl PreTransitionHook for VetoHook {
        fn name(&self) -> &str {
            "VetoHook"
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        async fn on_before(&self, _ctx: &TransitionContext) -> HookResult<HookDecision> {
            Ok(HookDecision::veto(self.reason))
        }
    }

    struct FailingPostHook;

    #[async_trait::async_trait]
    impl PostTransitionHook for FailingPostHook {
        fn name(&self) -> &str {
            "FailingPost"
        }

        async fn on_after(&self, _ctx: &TransitionContext) -> HookResult<()> {
            Err(HookError::ExternalService("notification service down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_empty_registry_allows() {
        let registry = HookRegistry::new();
        assert!(registry.run_pre(&ctx("complete")).await.is_ok());
        assert!(registry.run_post(&ctx("complete")).await.is_empty());
    }

    #[tokio::test]
    async fn test_hooks_scoped_to_their_transition() {
        let mut registry = HookRegistry::new();
        registry.register_pre(
            "investment",
            "refund",
            Arc::new(VetoHook { priority: 10, reason: "no refunds" }),
        );

        // Hook is keyed to "refund", so "complete" passes
        assert!(registry.run_pre(&ctx("complete")).await.is_ok());
        assert!(registry.run_pre(&ctx("refund")).await.is_err());
        assert_eq!(registry.pre_hook_count("investment", "refund"), 1);
        assert_eq!(registry.pre_hook_count("investment", "complete"), 0);
    }

    #[tokio::test]
    async fn test_first_veto_by_priority_wins() {
        let mut registry = HookRegistry::new();
        registry.register_pre(
            "investment",
            "complete",
            Arc::new(VetoHook { priority: 200, reason: "second" }),
        );
        registry.register_pre(
            "investment",
            "complete",
            Arc::new(VetoHook { priority: 50, reason: "first" }),
        );

        let err = registry.run_pre(&ctx("complete")).await.unwrap_err();
        match err {
            EngineError::Vetoed { reason, .. } => assert_eq!(reason, "first"),
            other => panic!("expected veto, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_failures_collected_not_raised() {
        let mut registry = HookRegistry::new();
        registry.register_post("investment", "complete", Arc::new(NoOpPostHook));
        registry.register_post("investment", "complete", Arc::new(FailingPostHook));

        let failures = registry.run_post(&ctx("complete")).await;
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("FailingPost"));
        assert!(failures[0].contains("notification service down"));
    }

    #[tokio::test]
    async fn test_noop_hooks() {
        let mut registry = HookRegistry::new();
        registry.register_pre("investment", "complete", Arc::new(NoOpPreHook));
        registry.register_post("investment", "complete", Arc::new(NoOpPostHook));

        assert!(registry.run_pre(&ctx("complete")).await.is_ok());
        assert!(registry.run_post(&ctx("complete")).await.is_empty());
    }
}
