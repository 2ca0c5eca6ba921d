//! Speaking-session persistence
//!
//! Session documents live in ScyllaDB with the nested transcript and
//! metadata stored as JSON columns. Writers never hold locks: every
//! save is checked against the document's version token, and a
//! concurrent update surfaces as [`PersistenceError::VersionConflict`]
//! for the caller to retry.

pub mod client;
pub mod error;
pub mod memory;
pub mod schema;
pub mod session;
pub mod store;

pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use memory::InMemorySessionStore;
pub use session::{SessionDocument, SYSTEM_PROMPT_KEY};
pub use store::{ScyllaSessionStore, SessionStore};

/// Initialize the persistence layer with ScyllaDB
pub async fn init(config: ScyllaConfig) -> Result<ScyllaSessionStore, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaSessionStore::new(client))
}
