//! In-memory session store
//!
//! Same optimistic-versioning contract as the ScyllaDB store, backed by
//! a map. Used in tests and for local development without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::PersistenceError;
use crate::session::SessionDocument;
use crate::store::SessionStore;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionDocument>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &SessionDocument) -> Result<(), PersistenceError> {
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SessionDocument>, PersistenceError> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn save(&self, session: &SessionDocument) -> Result<(), PersistenceError> {
        let mut sessions = self.sessions.write();

        let stored = sessions
            .get_mut(&session.id)
            .ok_or_else(|| PersistenceError::SessionNotFound(session.id.clone()))?;

        if stored.version != session.version {
            return Err(PersistenceError::VersionConflict(session.id.clone()));
        }

        let mut updated = session.clone();
        updated.version += 1;
        updated.updated_at = Utc::now();
        *stored = updated;

        Ok(())
    }
}
