//! Application state
//!
//! Shared state across all handlers. Provider clients are owned by the
//! orchestrator; the state only carries what handlers need.

use std::sync::Arc;

use speaktutor_config::Settings;
use speaktutor_dialogue::DialogueOrchestrator;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Dialogue orchestrator
    pub orchestrator: Arc<DialogueOrchestrator>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Settings, orchestrator: DialogueOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
