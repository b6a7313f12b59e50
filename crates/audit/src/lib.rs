//! Veritrail Audit - append-only audit trail
//!
//! Single source of truth for "what changed, who changed it, when".
//! The JSONL log is the Source of Truth - the SQLite index is a disposable
//! projection for indexed history queries.
//!
//! The public contract has no update and no delete: a correction is itself
//! a new appended event referencing the corrected one by id.

pub mod error;
pub mod event;
pub mod index;
pub mod query;
pub mod reader;
pub mod store;

pub use error::AuditError;
pub use event::{AuditEvent, AuditEventBuilder};
pub use index::AuditIndex;
pub use query::AuditQuery;
pub use reader::AuditReader;
pub use store::AuditLog;
