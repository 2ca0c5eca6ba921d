//! Speaking-turn orchestration
//!
//! One inbound request fans out to three providers - text generation,
//! audio TTS, viseme synthesis - and lands in one persisted transcript
//! update. Deadlines and retry budgets are chosen so a slow provider
//! degrades the response instead of hanging it; only text generation is
//! allowed to fail the request.

pub mod orchestrator;
pub mod request;

pub use orchestrator::{DialogueConfig, DialogueOrchestrator};
pub use request::{RespondRequest, RespondResponse};

use thiserror::Error;

use speaktutor_persistence::PersistenceError;

/// Dialogue errors surfaced to the HTTP layer
#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("speaking session not found: {0}")]
    SessionNotFound(String),

    #[error("failed to generate response")]
    Generation,

    #[error("store error: {0}")]
    Store(#[from] PersistenceError),
}
