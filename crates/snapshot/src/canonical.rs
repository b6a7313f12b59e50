//! Canonical serialization and content hashing
//!
//! The hash is only reproducible if serialization is deterministic: struct
//! fields serialize in declaration order, maps are BTree-ordered, and every
//! timestamp is UTC truncated to microseconds before it enters a record.

use crate::error::SnapshotError;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serialize a value to its canonical JSON form
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(value)?)
}

/// Compute the sha256 content hash over a value's canonical form
pub fn content_hash<T: Serialize>(value: &T) -> Result<String, SnapshotError> {
    let canonical = canonical_json(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Normalize a timestamp for canonical serialization: UTC, truncated to
/// microsecond precision so a parse/re-serialize cycle is lossless.
pub fn normalize_utc(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let micros = timestamp.nanosecond() / 1_000 * 1_000;
    timestamp
        .with_nanosecond(micros)
        .unwrap_or(timestamp)
}
