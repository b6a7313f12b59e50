//! JSONL audit log - append-only writer
//!
//! One file per UTC date; every append is flushed before returning so a
//! reported EventId is on disk. No update or delete exists here.

use crate::error::AuditError;
use crate::event::AuditEvent;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only JSONL audit log
pub struct AuditLog {
    base_path: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
}

impl AuditLog {
    /// Create a new log rooted at the given directory
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            current_file: None,
            current_date: None,
        })
    }

    /// Append an event, returning its id once it is durable.
    ///
    /// Never fails silently: any IO or serialization problem surfaces to
    /// the caller, who decides whether it is fatal for their operation.
    pub fn append(&mut self, event: &AuditEvent) -> Result<String, AuditError> {
        let date = event.occurred_at.format("%Y-%m-%d").to_string();

        // Rotate file if date changed
        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }

        if let Some(ref mut writer) = self.current_file {
            let json = serde_json::to_string(event)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        tracing::debug!(
            event_id = %event.id,
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            action = %event.action,
            "Audit event appended"
        );

        Ok(event.id.clone())
    }

    /// Rotate to a new file for the given date
    fn rotate_file(&mut self, date: &str) -> Result<(), AuditError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }

        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());

        Ok(())
    }

    /// Get the path to today's file
    pub fn today_file_path(&self) -> PathBuf {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        self.base_path.join(format!("{}.jsonl", date))
    }

    /// List all JSONL files in the log
    pub fn list_files(&self) -> Result<Vec<PathBuf>, AuditError> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "jsonl") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<(), AuditError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use veritrail_core::{ActorRef, EntityRef};

    fn event(entity_id: &str) -> AuditEvent {
        AuditEvent::builder(
            ActorRef::user("USR-1"),
            &EntityRef::new("investment", entity_id),
            "state.complete",
            "investments",
        )
        .old_value("status", "pending")
        .new_value("status", "completed")
        .build()
    }

    #[test]
    fn test_append_returns_event_id() {
        let dir = tempdir().unwrap();
        let mut log = AuditLog::new(dir.path()).unwrap();

        let first = event("INV-001");
        let id = log.append(&first).unwrap();
        assert_eq!(id, first.id);
    }

    #[test]
    fn test_append_is_durable_per_event() {
        let dir = tempdir().unwrap();

        {
            let mut log = AuditLog::new(dir.path()).unwrap();
            log.append(&event("INV-001")).unwrap();
            log.append(&event("INV-002")).unwrap();
            // Dropped without explicit close
        }

        let files = AuditLog::new(dir.path()).unwrap().list_files().unwrap();
        assert_eq!(files.len(), 1);
        let content = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("INV-001"));
        assert!(content.contains("INV-002"));
    }
}
