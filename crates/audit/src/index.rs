//! SQLite secondary index over the audit log
//!
//! A disposable projection of the JSONL log for indexed history queries:
//! `(entity_type, entity_id)` plus per-field rows, so field-level history
//! never scans JSON payloads. Rebuildable from the log at any time; the
//! log remains the source of truth.

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::query::AuditQuery;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;

/// SQLite index for audit history queries
pub struct AuditIndex {
    conn: Connection,
}

impl AuditIndex {
    /// Create an index backed by the given database path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, AuditError> {
        let conn = Connection::open(path)?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    /// Create an in-memory index (for testing)
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory()?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), AuditError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS audit_events (
                id TEXT PRIMARY KEY,
                occurred_at TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                action TEXT NOT NULL,
                module TEXT NOT NULL,
                event_json TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_events_entity
             ON audit_events(entity_type, entity_id, occurred_at)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS audit_event_fields (
                event_id TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                field TEXT NOT NULL,
                PRIMARY KEY (event_id, field)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_event_fields_lookup
             ON audit_event_fields(entity_type, entity_id, field)",
            [],
        )?;

        Ok(())
    }

    /// Index one event. Idempotent: re-indexing an already-seen id is a
    /// no-op, so log replay is safe.
    pub fn index_event(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let event_json = serde_json::to_string(event)?;

        self.conn.execute(
            "INSERT OR IGNORE INTO audit_events
             (id, occurred_at, actor_id, entity_type, entity_id, action, module, event_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.id,
                event.occurred_at.to_rfc3339(),
                event.actor.audit_id(),
                event.entity_type,
                event.entity_id,
                event.action,
                event.module,
                event_json,
            ],
        )?;

        for field in event.changed_fields() {
            self.conn.execute(
                "INSERT OR IGNORE INTO audit_event_fields (event_id, entity_type, entity_id, field)
                 VALUES (?1, ?2, ?3, ?4)",
                params![event.id, event.entity_type, event.entity_id, field],
            )?;
        }

        Ok(())
    }

    /// Drop and repopulate the index from a replayed event sequence.
    ///
    /// Only the projection is cleared - the JSONL log is untouched.
    pub fn rebuild<'a>(
        &self,
        events: impl IntoIterator<Item = &'a AuditEvent>,
    ) -> Result<usize, AuditError> {
        self.conn.execute("DELETE FROM audit_event_fields", [])?;
        self.conn.execute("DELETE FROM audit_events", [])?;

        let mut indexed = 0;
        for event in events {
            self.index_event(event)?;
            indexed += 1;
        }

        tracing::debug!(indexed, "Audit index rebuilt");
        Ok(indexed)
    }

    /// Run a filtered history query, newest first
    pub fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, AuditError> {
        let mut sql = String::from("SELECT event_json FROM audit_events WHERE 1=1");
        let mut values: Vec<String> = Vec::new();

        if let Some(ref entity_type) = query.entity_type {
            values.push(entity_type.clone());
            sql.push_str(&format!(" AND entity_type = ?{}", values.len()));
        }
        if let Some(ref entity_id) = query.entity_id {
            values.push(entity_id.clone());
            sql.push_str(&format!(" AND entity_id = ?{}", values.len()));
        }
        if let Some(ref actor_id) = query.actor_id {
            values.push(actor_id.clone());
            sql.push_str(&format!(" AND actor_id = ?{}", values.len()));
        }
        if let Some(ref prefix) = query.action_prefix {
            // Escape LIKE wildcards so the prefix is matched literally
            let escaped = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            values.push(format!("{}%", escaped));
            sql.push_str(&format!(" AND action LIKE ?{} ESCAPE '\\'", values.len()));
        }
        if let Some(ref field) = query.field {
            values.push(field.clone());
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM audit_event_fields f
                   WHERE f.event_id = audit_events.id AND f.field = ?{})",
                values.len()
            ));
        }

        sql.push_str(" ORDER BY occurred_at DESC, id DESC");
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if query.offset > 0 {
            if query.limit.is_none() {
                sql.push_str(" LIMIT -1");
            }
            sql.push_str(&format!(" OFFSET {}", query.offset));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows: Vec<String> = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut events = Vec::with_capacity(rows.len());
        for json in rows {
            events.push(serde_json::from_str(&json)?);
        }

        Ok(events)
    }

    /// Fetch one indexed event by id
    pub fn get(&self, event_id: &str) -> Result<AuditEvent, AuditError> {
        let json: String = self
            .conn
            .query_row(
                "SELECT event_json FROM audit_events WHERE id = ?1",
                params![event_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => AuditError::NotFound(event_id.to_string()),
                other => AuditError::Database(other),
            })?;

        Ok(serde_json::from_str(&json)?)
    }

    /// Total indexed events
    pub fn count(&self) -> Result<usize, AuditError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM audit_events", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
