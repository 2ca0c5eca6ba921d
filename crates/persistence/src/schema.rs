//! Keyspace and table creation

use scylla::Session;

use crate::error::PersistenceError;

pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
         {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, ())
        .await
        .map_err(|e| PersistenceError::Schema(e.to_string()))?;

    Ok(())
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE TABLE IF NOT EXISTS {}.speaking_sessions (
            session_id text PRIMARY KEY,
            created_at bigint,
            updated_at bigint,
            version bigint,
            transcript_json text,
            metadata_json text
        )",
        keyspace
    );

    session
        .query_unpaged(query, ())
        .await
        .map_err(|e| PersistenceError::Schema(e.to_string()))?;

    Ok(())
}
