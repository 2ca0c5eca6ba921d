//! Application configuration
//!
//! Layered settings loaded from `config/default`, an optional
//! environment-specific file, and `SPEAKTUTOR__`-prefixed environment
//! variables, in that order of increasing precedence.

pub mod settings;

pub use settings::{
    load_settings, AuthConfig, DialogueSettings, LlmSettings, ObservabilityConfig,
    PersistenceSettings, ServerConfig, Settings, SpeechSettings, TtsSettings,
    VisemeEngineSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
