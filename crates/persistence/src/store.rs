//! Session store trait and the ScyllaDB implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use speaktutor_core::ConversationTurn;

use crate::client::ScyllaClient;
use crate::error::PersistenceError;
use crate::session::SessionDocument;

/// Document store with single-document optimistic versioning
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session document
    async fn create(&self, session: &SessionDocument) -> Result<(), PersistenceError>;

    /// Fetch a session by id
    async fn find_by_id(&self, id: &str) -> Result<Option<SessionDocument>, PersistenceError>;

    /// Save against `session.version`. The stored version is bumped on
    /// success; a concurrent update since the read surfaces as
    /// [`PersistenceError::VersionConflict`].
    async fn save(&self, session: &SessionDocument) -> Result<(), PersistenceError>;
}

/// ScyllaDB implementation of the session store
///
/// The nested transcript and metadata are stored as JSON columns; the
/// version check rides on a lightweight transaction.
#[derive(Clone)]
pub struct ScyllaSessionStore {
    client: ScyllaClient,
}

impl ScyllaSessionStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

type SessionRow = (String, i64, i64, i64, Option<String>, Option<String>);

fn decode_row(row: SessionRow) -> Result<SessionDocument, PersistenceError> {
    let (id, created_at, updated_at, version, transcript_json, metadata_json) = row;

    let transcript: Vec<ConversationTurn> = match transcript_json {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };
    let metadata = match metadata_json {
        Some(json) => serde_json::from_str(&json)?,
        None => Default::default(),
    };

    Ok(SessionDocument {
        id,
        transcript,
        metadata,
        version: version as u64,
        created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_else(Utc::now),
    })
}

#[async_trait]
impl SessionStore for ScyllaSessionStore {
    async fn create(&self, session: &SessionDocument) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.speaking_sessions (
                session_id, created_at, updated_at, version,
                transcript_json, metadata_json
            ) VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &session.id,
                    session.created_at.timestamp_millis(),
                    session.updated_at.timestamp_millis(),
                    session.version as i64,
                    serde_json::to_string(&session.transcript)?,
                    serde_json::to_string(&session.metadata)?,
                ),
            )
            .await?;

        tracing::debug!(session_id = %session.id, "Session created");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SessionDocument>, PersistenceError> {
        let query = format!(
            "SELECT session_id, created_at, updated_at, version,
                    transcript_json, metadata_json
             FROM {}.speaking_sessions WHERE session_id = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (id,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let typed: SessionRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return Ok(Some(decode_row(typed)?));
            }
        }

        Ok(None)
    }

    async fn save(&self, session: &SessionDocument) -> Result<(), PersistenceError> {
        let query = format!(
            "UPDATE {}.speaking_sessions SET
                updated_at = ?,
                version = ?,
                transcript_json = ?,
                metadata_json = ?
             WHERE session_id = ? IF version = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(
                query,
                (
                    Utc::now().timestamp_millis(),
                    (session.version + 1) as i64,
                    serde_json::to_string(&session.transcript)?,
                    serde_json::to_string(&session.metadata)?,
                    &session.id,
                    session.version as i64,
                ),
            )
            .await?;

        // The LWT result row leads with the [applied] flag.
        let applied = result
            .rows
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.columns.into_iter().next().flatten())
            .and_then(|value| value.as_boolean())
            .unwrap_or(false);

        if !applied {
            return Err(PersistenceError::VersionConflict(session.id.clone()));
        }

        tracing::debug!(
            session_id = %session.id,
            version = session.version + 1,
            turns = session.transcript.len(),
            "Session saved"
        );
        Ok(())
    }
}
