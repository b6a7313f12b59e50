//! Snapshot store - append-only JSONL persistence
//!
//! Retention is indefinite: no delete exists. Corrections append a new
//! snapshot whose `supersedes` names the old one; readers follow the chain.

use crate::error::SnapshotError;
use crate::record::Snapshot;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only JSONL store for snapshots
pub struct SnapshotStore {
    path: PathBuf,
    file: Option<File>,
}

impl SnapshotStore {
    /// Create a store at the given path
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Create an in-memory store (for testing; validates serialization only)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            file: None,
        }
    }

    /// Append a snapshot. The record must already verify - a store never
    /// accepts content that does not match its own hash.
    pub fn append(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        snapshot.verify()?;

        if let Some(ref mut file) = self.file {
            let json = serde_json::to_string(snapshot)?;
            writeln!(file, "{}", json)?;
            file.flush()?;
        } else {
            let _ = serde_json::to_string(snapshot)?;
        }

        tracing::debug!(snapshot_id = %snapshot.id, "Snapshot persisted");
        Ok(())
    }

    /// Read all snapshots in append order
    pub fn read_all(&self) -> Result<Vec<Snapshot>, SnapshotError> {
        if self.file.is_none() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut snapshots = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let snapshot: Snapshot = serde_json::from_str(&line)?;
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    /// Find one snapshot by id. Absence is `NotFound` - tampering on a
    /// present record is a different, louder error raised by `load_verified`.
    pub fn find_by_id(&self, snapshot_id: &str) -> Result<Snapshot, SnapshotError> {
        self.read_all()?
            .into_iter()
            .find(|snapshot| snapshot.id == snapshot_id)
            .ok_or_else(|| SnapshotError::NotFound(snapshot_id.to_string()))
    }

    /// Find and verify one snapshot: re-serializes stored fields and checks
    /// the recorded hash before returning the record.
    pub fn load_verified(&self, snapshot_id: &str) -> Result<Snapshot, SnapshotError> {
        let snapshot = self.find_by_id(snapshot_id)?;
        snapshot.verify()?;
        Ok(snapshot)
    }

    /// All snapshots for a subject, in capture order
    pub fn find_by_subject(&self, subject_id: &str) -> Result<Vec<Snapshot>, SnapshotError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|snapshot| snapshot.subject_id == subject_id)
            .collect())
    }

    /// The latest non-superseded snapshot for a subject
    pub fn current_for_subject(&self, subject_id: &str) -> Result<Option<Snapshot>, SnapshotError> {
        let snapshots = self.find_by_subject(subject_id)?;
        let superseded: Vec<String> = snapshots
            .iter()
            .filter_map(|snapshot| snapshot.supersedes.clone())
            .collect();

        Ok(snapshots
            .into_iter()
            .filter(|snapshot| !superseded.contains(&snapshot.id))
            .last())
    }

    /// Path to the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
