//! Speaking-session documents

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use speaktutor_core::ConversationTurn;

/// Metadata key under which the session's system prompt is cached.
/// Written at most once per session; the same prompt must be reused on
/// every later turn so the model stays consistent.
pub const SYSTEM_PROMPT_KEY: &str = "systemPrompt";

/// Speaking-session aggregate
///
/// The transcript is append-only: turns are never edited or removed,
/// and insertion order is chronological order. `version` is the
/// opaque optimistic-concurrency token managed by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: String,
    pub transcript: Vec<ConversationTurn>,
    pub metadata: HashMap<String, String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionDocument {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            transcript: Vec::new(),
            metadata: HashMap::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn to the transcript
    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.transcript.push(turn);
    }

    /// The most recent `count` turns, oldest first
    pub fn last_turns(&self, count: usize) -> &[ConversationTurn] {
        let start = self.transcript.len().saturating_sub(count);
        &self.transcript[start..]
    }

    /// The cached system prompt, if one has been set
    pub fn system_prompt(&self) -> Option<&str> {
        self.metadata.get(SYSTEM_PROMPT_KEY).map(String::as_str)
    }

    /// Cache the system prompt unless one is already present. Returns
    /// whether the prompt was written.
    pub fn set_system_prompt_if_absent(&mut self, prompt: &str) -> bool {
        if self.metadata.contains_key(SYSTEM_PROMPT_KEY) {
            return false;
        }
        self.metadata
            .insert(SYSTEM_PROMPT_KEY.to_string(), prompt.to_string());
        true
    }
}
