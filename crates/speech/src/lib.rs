//! Speech synthesis adapters
//!
//! Two independent synthesis paths serve each spoken response:
//! - the audio TTS provider renders the voice the learner hears, and
//! - the viseme engine renders the timed mouth-shape events that drive
//!   lip sync.
//!
//! They run on different providers, so each path has its own client and
//! its own failure policy; the orchestrator coordinates retries and
//! deadlines across both.

pub mod engine;
pub mod tts;
pub mod viseme;
pub mod voices;

pub use engine::{AzureEngineConfig, AzureSpeechEngine};
pub use tts::{AudioSynthesizer, OpenAiTts, TtsClientConfig};
pub use viseme::{
    EngineEvent, SpeechEventAdapter, VisemeEngine, VisemeSynthesis, VisemeSynthesizer,
};
pub use voices::VoiceId;

use thiserror::Error;

/// Speech synthesis errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("client construction failed: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("engine error: {0}")]
    Engine(String),
}

impl SpeechError {
    /// Rate-limit class failures get a longer retry backoff.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SpeechError::RateLimited)
    }
}
