//! Veritrail Snapshot - tamper-evident point-in-time captures
//!
//! A Snapshot freezes what an entity and its surrounding context looked
//! like at a triggering business event: company compliance state, the
//! disclosure versions actually shown, active risk flags, acknowledgement
//! records, and computed financial terms. The record carries a sha256
//! content hash over a canonical serialization, so a regulator can verify
//! bit-for-bit that nothing changed after the fact.
//!
//! Snapshots are created exactly once, never mutated, never deleted. A
//! correction is a new snapshot carrying a `supersedes` back-reference.

pub mod canonical;
pub mod context;
pub mod error;
pub mod record;
pub mod store;

pub use canonical::{canonical_json, content_hash, normalize_utc};
pub use context::SnapshotContext;
pub use error::SnapshotError;
pub use record::{Acknowledgement, DisclosureRef, RiskFlag, Snapshot};
pub use store::SnapshotStore;
