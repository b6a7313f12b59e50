//! Snapshot record - immutable, hashed, created exactly once

use crate::canonical::{content_hash, normalize_utc};
use crate::context::SnapshotContext;
use crate::error::SnapshotError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use veritrail_core::{ActorRef, EntityRef, Money};

/// A disclosure version shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureRef {
    pub disclosure_id: String,
    /// Resolved document version; None means assembly failed to resolve it
    pub version: Option<u32>,
    pub title: Option<String>,
}

impl DisclosureRef {
    /// Reference a resolved disclosure version
    pub fn versioned(disclosure_id: impl Into<String>, version: u32) -> Self {
        Self {
            disclosure_id: disclosure_id.into(),
            version: Some(version),
            title: None,
        }
    }

    /// Reference a disclosure whose version could not be resolved.
    /// Capture will refuse a context containing one of these.
    pub fn unversioned(disclosure_id: impl Into<String>) -> Self {
        Self {
            disclosure_id: disclosure_id.into(),
            version: None,
            title: None,
        }
    }

    /// Attach a display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A risk flag active at capture time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub code: String,
    pub description: String,
}

impl RiskFlag {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

/// An acknowledgement collected from the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub disclosure_id: String,
    pub actor: ActorRef,
    pub accepted_at: DateTime<Utc>,
}

impl Acknowledgement {
    pub fn new(
        disclosure_id: impl Into<String>,
        actor: ActorRef,
        accepted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            disclosure_id: disclosure_id.into(),
            actor,
            accepted_at,
        }
    }
}

/// Immutable point-in-time capture of a subject plus its context.
///
/// # Invariant
/// `content_hash == sha256(canonical_json(snapshot-without-hash))`. Once
/// persisted no field may change; a correction is a new snapshot whose
/// `supersedes` names this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot id (`SNAP-` prefixed)
    pub id: String,
    /// Declared type of the subject entity
    pub subject_type: String,
    /// Opaque id of the subject entity
    pub subject_id: String,
    /// Instant of capture (UTC, microsecond precision)
    pub captured_at: DateTime<Utc>,
    /// Company compliance state at capture
    pub company_state: String,
    /// Disclosure versions actually shown
    pub disclosures_shown: Vec<DisclosureRef>,
    /// Risk flags active at capture
    pub risk_flags: Vec<RiskFlag>,
    /// Acknowledgements collected
    pub acknowledgements: Vec<Acknowledgement>,
    /// Computed financial terms in exact minor units
    pub financial_terms: BTreeMap<String, Money>,
    /// Snapshot this one corrects, if any
    pub supersedes: Option<String>,
    /// sha256 over the canonical serialization of everything above
    pub content_hash: String,
}

/// The hashed portion of a snapshot - every field except the hash itself.
/// Field order here IS the canonical order; keep it in sync with `Snapshot`.
#[derive(Serialize)]
struct SnapshotDigest<'a> {
    id: &'a str,
    subject_type: &'a str,
    subject_id: &'a str,
    captured_at: &'a DateTime<Utc>,
    company_state: &'a str,
    disclosures_shown: &'a [DisclosureRef],
    risk_flags: &'a [RiskFlag],
    acknowledgements: &'a [Acknowledgement],
    financial_terms: &'a BTreeMap<String, Money>,
    supersedes: &'a Option<String>,
}

impl Snapshot {
    /// Capture a snapshot of a subject and its assembled context.
    ///
    /// Validates the context first; on `IncompleteSnapshot` nothing is
    /// built and nothing may be persisted. The returned snapshot carries
    /// its content hash, ready for the caller to expose for verification.
    pub fn capture(
        subject: &EntityRef,
        context: SnapshotContext,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        Self::assemble(subject, context, captured_at, None)
    }

    /// Capture a correcting snapshot, back-referencing the one it replaces.
    pub fn capture_correction(
        original: &Snapshot,
        context: SnapshotContext,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        let subject = EntityRef::new(original.subject_type.clone(), original.subject_id.clone());
        Self::assemble(&subject, context, captured_at, Some(original.id.clone()))
    }

    fn assemble(
        subject: &EntityRef,
        mut context: SnapshotContext,
        captured_at: DateTime<Utc>,
        supersedes: Option<String>,
    ) -> Result<Self, SnapshotError> {
        context.validate()?;

        for ack in &mut context.acknowledgements {
            ack.accepted_at = normalize_utc(ack.accepted_at);
        }

        let mut snapshot = Self {
            id: format!("SNAP-{}", Uuid::new_v4()),
            subject_type: subject.entity_type.clone(),
            subject_id: subject.entity_id.clone(),
            captured_at: normalize_utc(captured_at),
            company_state: context.company_state,
            disclosures_shown: context.disclosures_shown,
            risk_flags: context.risk_flags,
            acknowledgements: context.acknowledgements,
            financial_terms: context.financial_terms,
            supersedes,
            content_hash: String::new(),
        };
        snapshot.content_hash = snapshot.compute_hash()?;

        tracing::debug!(
            snapshot_id = %snapshot.id,
            subject_type = %snapshot.subject_type,
            subject_id = %snapshot.subject_id,
            hash = %snapshot.content_hash,
            "Snapshot captured"
        );

        Ok(snapshot)
    }

    /// Recompute the content hash from stored fields
    pub fn compute_hash(&self) -> Result<String, SnapshotError> {
        content_hash(&SnapshotDigest {
            id: &self.id,
            subject_type: &self.subject_type,
            subject_id: &self.subject_id,
            captured_at: &self.captured_at,
            company_state: &self.company_state,
            disclosures_shown: &self.disclosures_shown,
            risk_flags: &self.risk_flags,
            acknowledgements: &self.acknowledgements,
            financial_terms: &self.financial_terms,
            supersedes: &self.supersedes,
        })
    }

    /// Render the snapshot as a single immutable document, hash included,
    /// suitable for download or print. Verifies first: a tampered record
    /// is never exported as if it were authentic.
    pub fn to_document(&self) -> Result<String, SnapshotError> {
        self.verify()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Verify stored content against the recorded hash.
    ///
    /// Re-serializes the stored fields, recomputes the hash, and compares.
    /// A mismatch means the record was altered after capture and surfaces
    /// as the loud `TamperDetected` class, never as a not-found.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        let computed = self.compute_hash()?;
        if computed != self.content_hash {
            tracing::error!(
                snapshot_id = %self.id,
                expected = %computed,
                actual = %self.content_hash,
                "Snapshot content hash mismatch"
            );
            return Err(SnapshotError::TamperDetected {
                snapshot_id: self.id.clone(),
                expected: computed,
                actual: self.content_hash.clone(),
            });
        }
        Ok(())
    }
}
