//! JSONL audit reader - sequential reader for replay and history queries

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::query::AuditQuery;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Sequential reader over an audit log directory
pub struct AuditReader {
    files: Vec<std::path::PathBuf>,
}

impl AuditReader {
    /// Create a new reader from a directory
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                let file_path = entry.path();
                if file_path.extension().map_or(false, |ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        files.sort();

        Ok(Self { files })
    }

    /// Read all events from all files in append order
    pub fn read_all(&self) -> Result<Vec<AuditEvent>, AuditError> {
        let mut events = Vec::new();

        for file_path in &self.files {
            let file = File::open(file_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let event: AuditEvent = serde_json::from_str(&line)?;
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Run a filtered history query over the log.
    ///
    /// Returns a reverse-chronological page per the query's limit/offset.
    pub fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(query.apply(self.read_all()?))
    }

    /// Find one event by id
    pub fn find(&self, event_id: &str) -> Result<AuditEvent, AuditError> {
        self.read_all()?
            .into_iter()
            .find(|event| event.id == event_id)
            .ok_or_else(|| AuditError::NotFound(event_id.to_string()))
    }

    /// Count total events across all files
    pub fn count(&self) -> Result<usize, AuditError> {
        let mut count = 0;

        for file_path in &self.files {
            let file = File::open(file_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AuditLog;
    use tempfile::tempdir;
    use veritrail_core::{ActorRef, EntityRef};

    fn seed(dir: &Path) -> Vec<String> {
        let mut log = AuditLog::new(dir).unwrap();
        let mut ids = Vec::new();

        for i in 0..3 {
            let event = AuditEvent::builder(
                ActorRef::user("USR-1"),
                &EntityRef::new("investment", format!("INV-{:03}", i)),
                "state.complete",
                "investments",
            )
            .old_value("status", "pending")
            .new_value("status", "completed")
            .build();
            ids.push(log.append(&event).unwrap());
        }

        ids
    }

    #[test]
    fn test_read_all_round_trip() {
        let dir = tempdir().unwrap();
        let ids = seed(dir.path());

        let reader = AuditReader::from_directory(dir.path()).unwrap();
        let events = reader.read_all().unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].id, ids[0]);
        assert_eq!(reader.count().unwrap(), 3);
    }

    #[test]
    fn test_find_by_id() {
        let dir = tempdir().unwrap();
        let ids = seed(dir.path());

        let reader = AuditReader::from_directory(dir.path()).unwrap();
        let event = reader.find(&ids[1]).unwrap();
        assert_eq!(event.entity_id, "INV-001");

        assert!(matches!(
            reader.find("EVT-missing"),
            Err(AuditError::NotFound(_))
        ));
    }

    #[test]
    fn test_query_through_reader() {
        let dir = tempdir().unwrap();
        seed(dir.path());

        let reader = AuditReader::from_directory(dir.path()).unwrap();
        let page = reader
            .query(&AuditQuery::for_entity("investment", "INV-002"))
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].entity_id, "INV-002");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let reader = AuditReader::from_directory(dir.path().join("nothing-here")).unwrap();
        assert_eq!(reader.count().unwrap(), 0);
    }
}
