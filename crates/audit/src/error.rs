//! Audit trail errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Audit event not found: {0}")]
    NotFound(String),

    #[error("Invalid audit file: {0}")]
    InvalidFile(String),
}
