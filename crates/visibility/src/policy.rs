//! The public-visibility predicate
//!
//! A parent is publicly visible iff its tier is at or above the threshold.
//! A child is publicly visible iff its own eligibility holds AND its
//! parent's tier is at or above the threshold. Both rules share one
//! predicate; no query path carries its own copy.

use crate::tier::VisibilityTier;
use veritrail_machine::{MachineError, StateConfig};

/// Parent entities expose their compliance tier.
///
/// `None` means tier data is missing; the policy fails closed on it.
pub trait Tiered {
    fn tier(&self) -> Option<VisibilityTier>;
}

/// Child entities expose their own eligibility and their parent's tier.
pub trait ListedChild {
    /// The child's own listing conditions (e.g. product is active)
    fn eligible(&self) -> bool;
    /// Tier of the owning parent, if known
    fn parent_tier(&self) -> Option<VisibilityTier>;
}

/// The read-side visibility policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
    threshold: VisibilityTier,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            threshold: VisibilityTier::Live,
        }
    }
}

impl VisibilityPolicy {
    /// Create a policy with an explicit threshold
    pub fn new(threshold: VisibilityTier) -> Self {
        Self { threshold }
    }

    /// The tier at which entities become publicly visible
    pub fn threshold(&self) -> VisibilityTier {
        self.threshold
    }

    /// THE predicate. Missing tier data is never visible (fail closed).
    pub fn is_public(&self, tier: Option<VisibilityTier>) -> bool {
        match tier {
            Some(tier) => tier >= self.threshold,
            None => false,
        }
    }

    /// Whether a parent entity is publicly visible
    pub fn parent_visible<T: Tiered>(&self, parent: &T) -> bool {
        self.is_public(parent.tier())
    }

    /// Whether a child entity is publicly visible: its own eligibility
    /// AND its parent's tier, through the same predicate.
    pub fn child_visible<C: ListedChild>(&self, child: &C) -> bool {
        child.eligible() && self.is_public(child.parent_tier())
    }

    /// Filter a parent sequence down to the publicly visible ones
    pub fn public_parents<'a, T, I>(&self, parents: I) -> impl Iterator<Item = &'a T>
    where
        T: Tiered + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let policy = *self;
        parents
            .into_iter()
            .filter(move |parent| policy.parent_visible(*parent))
    }

    /// Filter a child sequence down to the publicly visible ones
    pub fn public_children<'a, C, I>(&self, children: I) -> impl Iterator<Item = &'a C>
    where
        C: ListedChild + 'a,
        I: IntoIterator<Item = &'a C>,
    {
        let policy = *self;
        children
            .into_iter()
            .filter(move |child| policy.child_visible(*child))
    }
}

/// Tier promotion as an explicit, audited state machine.
///
/// Strictly one step up per transition, no demotion declared: lowering a
/// tier requires adding an explicit audited transition, never a silent
/// field write.
pub fn promotion_config() -> Result<StateConfig, MachineError> {
    let mut builder = StateConfig::builder("tier");
    for tier in VisibilityTier::all() {
        builder = builder.state(tier.to_string());
    }
    for tier in VisibilityTier::all() {
        if let Some(next) = tier.next() {
            builder = builder.labeled_transition(
                format!("promote_to_{}", next),
                [tier.to_string()],
                next.to_string(),
                format!("Promote to {}", next),
            );
        }
    }
    builder.build()
}
