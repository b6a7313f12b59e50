//! Visibility tiers - ordered compliance classification
//!
//! `Pending < Upcoming < Live < Featured`. Comparison uses the discriminant,
//! so "at or above threshold" is an ordinary `>=`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum_macros::{Display, EnumString};

/// Ordered compliance tier of a parent entity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VisibilityTier {
    Pending = 1,
    Upcoming = 2,
    Live = 3,
    Featured = 4,
}

impl PartialOrd for VisibilityTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VisibilityTier {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

impl Default for VisibilityTier {
    fn default() -> Self {
        VisibilityTier::Pending
    }
}

impl VisibilityTier {
    /// The next tier up, if any. Promotion is strictly one step at a time.
    pub fn next(&self) -> Option<VisibilityTier> {
        match self {
            VisibilityTier::Pending => Some(VisibilityTier::Upcoming),
            VisibilityTier::Upcoming => Some(VisibilityTier::Live),
            VisibilityTier::Live => Some(VisibilityTier::Featured),
            VisibilityTier::Featured => None,
        }
    }

    /// All tiers in ascending order
    pub fn all() -> [VisibilityTier; 4] {
        [
            VisibilityTier::Pending,
            VisibilityTier::Upcoming,
            VisibilityTier::Live,
            VisibilityTier::Featured,
        ]
    }
}
