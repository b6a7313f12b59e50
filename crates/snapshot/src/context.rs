//! SnapshotContext - the surrounding facts frozen alongside a subject
//!
//! The caller assembles the full context at the triggering event. Assembly
//! is validated before any hash is computed or any byte persisted: an
//! incomplete regulatory record is worse than no record with a clear
//! failure signal.

use crate::error::SnapshotError;
use crate::record::{Acknowledgement, DisclosureRef, RiskFlag};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use veritrail_core::Money;

/// Context embedded in a snapshot at capture time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotContext {
    /// Compliance state of the parent company at the instant of capture
    pub company_state: String,
    /// Disclosure versions actually shown to the user
    pub disclosures_shown: Vec<DisclosureRef>,
    /// Risk flags active at the instant of capture
    pub risk_flags: Vec<RiskFlag>,
    /// Acknowledgements collected from the user
    pub acknowledgements: Vec<Acknowledgement>,
    /// Computed financial terms, exact minor-unit amounts
    pub financial_terms: BTreeMap<String, Money>,
}

impl SnapshotContext {
    /// Start an empty context for the given company state
    pub fn new(company_state: impl Into<String>) -> Self {
        Self {
            company_state: company_state.into(),
            ..Self::default()
        }
    }

    /// Record a disclosure as shown
    pub fn disclosure(mut self, disclosure: DisclosureRef) -> Self {
        self.disclosures_shown.push(disclosure);
        self
    }

    /// Record an active risk flag
    pub fn risk_flag(mut self, flag: RiskFlag) -> Self {
        self.risk_flags.push(flag);
        self
    }

    /// Record a collected acknowledgement
    pub fn acknowledgement(mut self, ack: Acknowledgement) -> Self {
        self.acknowledgements.push(ack);
        self
    }

    /// Record a computed financial term
    pub fn financial_term(mut self, name: impl Into<String>, amount: Money) -> Self {
        self.financial_terms.insert(name.into(), amount);
        self
    }

    /// Validate completeness. Called by capture before anything persists.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.company_state.trim().is_empty() {
            return Err(SnapshotError::IncompleteSnapshot(
                "company state missing".to_string(),
            ));
        }

        let mut shown = BTreeSet::new();
        for disclosure in &self.disclosures_shown {
            if disclosure.disclosure_id.trim().is_empty() {
                return Err(SnapshotError::IncompleteSnapshot(
                    "disclosure reference missing an id".to_string(),
                ));
            }
            match disclosure.version {
                Some(version) if version > 0 => {}
                _ => {
                    return Err(SnapshotError::IncompleteSnapshot(format!(
                        "disclosure '{}' has no resolved version",
                        disclosure.disclosure_id
                    )));
                }
            }
            shown.insert(disclosure.disclosure_id.as_str());
        }

        for ack in &self.acknowledgements {
            if !shown.contains(ack.disclosure_id.as_str()) {
                return Err(SnapshotError::IncompleteSnapshot(format!(
                    "acknowledgement references disclosure '{}' that was not shown",
                    ack.disclosure_id
                )));
            }
        }

        if self.financial_terms.is_empty() {
            return Err(SnapshotError::IncompleteSnapshot(
                "no financial terms computed".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use veritrail_core::ActorRef;

    fn valid_context() -> SnapshotContext {
        SnapshotContext::new("approved")
            .disclosure(DisclosureRef::versioned("DSC-RISK", 3))
            .acknowledgement(Acknowledgement::new(
                "DSC-RISK",
                ActorRef::user("USR-1"),
                Utc::now(),
            ))
            .risk_flag(RiskFlag::new("ILLIQUID", "No secondary market"))
            .financial_term("total_amount", Money::from_minor_units(500000).unwrap())
    }

    #[test]
    fn test_valid_context_passes() {
        assert!(valid_context().validate().is_ok());
    }

    #[test]
    fn test_missing_company_state_fails() {
        let mut context = valid_context();
        context.company_state = String::new();
        assert!(matches!(
            context.validate(),
            Err(SnapshotError::IncompleteSnapshot(_))
        ));
    }

    #[test]
    fn test_unresolved_disclosure_version_fails() {
        let context = SnapshotContext::new("approved")
            .disclosure(DisclosureRef::unversioned("DSC-RISK"))
            .financial_term("total_amount", Money::from_minor_units(500000).unwrap());
        let err = context.validate().unwrap_err();
        assert!(err.to_string().contains("DSC-RISK"));
    }

    #[test]
    fn test_dangling_acknowledgement_fails() {
        let context = SnapshotContext::new("approved")
            .disclosure(DisclosureRef::versioned("DSC-RISK", 1))
            .acknowledgement(Acknowledgement::new(
                "DSC-OTHER",
                ActorRef::user("USR-1"),
                Utc::now(),
            ))
            .financial_term("total_amount", Money::from_minor_units(1).unwrap());
        assert!(matches!(
            context.validate(),
            Err(SnapshotError::IncompleteSnapshot(_))
        ));
    }

    #[test]
    fn test_empty_financial_terms_fail() {
        let context = SnapshotContext::new("approved");
        assert!(matches!(
            context.validate(),
            Err(SnapshotError::IncompleteSnapshot(_))
        ));
    }
}
