//! Persistence error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("version conflict for session {0}")]
    VersionConflict(String),

    #[error("schema creation failed: {0}")]
    Schema(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl PersistenceError {
    /// Version conflicts are the only transient class a caller should
    /// retry; everything else is an outage or a bug.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, PersistenceError::VersionConflict(_))
    }
}

impl From<scylla::transport::errors::NewSessionError> for PersistenceError {
    fn from(e: scylla::transport::errors::NewSessionError) -> Self {
        PersistenceError::Connection(e.to_string())
    }
}

impl From<scylla::transport::errors::QueryError> for PersistenceError {
    fn from(e: scylla::transport::errors::QueryError) -> Self {
        PersistenceError::Query(e.to_string())
    }
}
