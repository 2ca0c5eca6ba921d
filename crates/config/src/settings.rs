//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Text generation configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Speech synthesis configuration
    #[serde(default)]
    pub speech: SpeechSettings,

    /// Dialogue orchestration policy
    #[serde(default)]
    pub dialogue: DialogueSettings,

    /// Persistence configuration
    #[serde(default)]
    pub persistence: PersistenceSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dialogue.generation_timeout_ms < 1_000 {
            return Err(ConfigError::InvalidValue {
                field: "dialogue.generation_timeout_ms".to_string(),
                message: "generation timeout below 1000ms cannot fit a model round trip"
                    .to_string(),
            });
        }

        if self.dialogue.tts_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dialogue.tts_attempts".to_string(),
                message: "at least one TTS attempt is required".to_string(),
            });
        }

        if self.dialogue.persist_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dialogue.persist_attempts".to_string(),
                message: "at least one persistence attempt is required".to_string(),
            });
        }

        if self.dialogue.history_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dialogue.history_turns".to_string(),
                message: "prompt history needs at least one turn".to_string(),
            });
        }

        if self.llm.api_key.is_empty() {
            tracing::warn!("llm.api_key is empty; text generation will be rejected upstream");
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty means any, for development)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
            auth: AuthConfig::default(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Enable authentication (off by default for development)
    #[serde(default)]
    pub enabled: bool,

    /// API key (set via SPEAKTUTOR__SERVER__AUTH__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Paths that bypass authentication
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string(), "/ready".to_string()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            public_paths: default_public_paths(),
        }
    }
}

/// Text generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Set via SPEAKTUTOR__LLM__API_KEY
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Client backstop timeout, above the orchestrator's deadline
    #[serde(default = "default_client_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    120
}
fn default_temperature() -> f32 {
    0.7
}
fn default_client_timeout_ms() -> u64 {
    15_000
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: String::new(),
            model: default_chat_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_ms: default_client_timeout_ms(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Audio TTS provider
    #[serde(default)]
    pub tts: TtsSettings,

    /// Viseme engine
    #[serde(default)]
    pub viseme: VisemeEngineSettings,
}

/// Audio TTS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Set via SPEAKTUTOR__SPEECH__TTS__API_KEY
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_tts_model")]
    pub model: String,

    #[serde(default = "default_tts_speed")]
    pub speed: f32,

    #[serde(default = "default_client_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}
fn default_tts_speed() -> f32 {
    1.0
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: String::new(),
            model: default_tts_model(),
            speed: default_tts_speed(),
            request_timeout_ms: default_client_timeout_ms(),
        }
    }
}

/// Viseme engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisemeEngineSettings {
    #[serde(default = "default_viseme_endpoint")]
    pub endpoint: String,

    /// Set via SPEAKTUTOR__SPEECH__VISEME__SUBSCRIPTION_KEY
    #[serde(default)]
    pub subscription_key: String,

    #[serde(default = "default_viseme_output_format")]
    pub output_format: String,
}

fn default_viseme_endpoint() -> String {
    "wss://eastus.tts.speech.microsoft.com/synthesis".to_string()
}
fn default_viseme_output_format() -> String {
    "audio-16khz-64kbitrate-mono-mp3".to_string()
}

impl Default for VisemeEngineSettings {
    fn default() -> Self {
        Self {
            endpoint: default_viseme_endpoint(),
            subscription_key: String::new(),
            output_format: default_viseme_output_format(),
        }
    }
}

/// Dialogue orchestration policy
///
/// Deadlines and retry budgets for the per-turn provider fan-out. The
/// defaults are the production values; tests override them to compress
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSettings {
    /// Hard deadline for text generation; a timeout fails the request
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Deadline for viseme synthesis; a timeout degrades to no lip sync
    #[serde(default = "default_viseme_timeout_ms")]
    pub viseme_timeout_ms: u64,

    /// Total audio TTS attempts
    #[serde(default = "default_tts_attempts")]
    pub tts_attempts: u32,

    /// Per-attempt TTS deadline for long responses
    #[serde(default = "default_tts_timeout_long_ms")]
    pub tts_timeout_long_ms: u64,

    /// Per-attempt TTS deadline for short responses
    #[serde(default = "default_tts_timeout_short_ms")]
    pub tts_timeout_short_ms: u64,

    /// Response length (chars) above which the long deadline applies
    #[serde(default = "default_tts_long_text_threshold")]
    pub tts_long_text_threshold: usize,

    /// Backoff before the retry after a rate-limit class failure
    #[serde(default = "default_tts_backoff_rate_limited_ms")]
    pub tts_backoff_rate_limited_ms: u64,

    /// Backoff before the retry after any other failure
    #[serde(default = "default_tts_backoff_ms")]
    pub tts_backoff_ms: u64,

    /// Total save attempts when the session document races
    #[serde(default = "default_persist_attempts")]
    pub persist_attempts: u32,

    /// Save backoff grows linearly: step times the attempt number
    #[serde(default = "default_persist_backoff_step_ms")]
    pub persist_backoff_step_ms: u64,

    /// Transcript turns included in the prompt (six exchanges)
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

fn default_generation_timeout_ms() -> u64 {
    12_000
}
fn default_viseme_timeout_ms() -> u64 {
    12_000
}
fn default_tts_attempts() -> u32 {
    2
}
fn default_tts_timeout_long_ms() -> u64 {
    12_000
}
fn default_tts_timeout_short_ms() -> u64 {
    8_000
}
fn default_tts_long_text_threshold() -> usize {
    60
}
fn default_tts_backoff_rate_limited_ms() -> u64 {
    1_500
}
fn default_tts_backoff_ms() -> u64 {
    500
}
fn default_persist_attempts() -> u32 {
    3
}
fn default_persist_backoff_step_ms() -> u64 {
    100
}
fn default_history_turns() -> usize {
    12
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            generation_timeout_ms: default_generation_timeout_ms(),
            viseme_timeout_ms: default_viseme_timeout_ms(),
            tts_attempts: default_tts_attempts(),
            tts_timeout_long_ms: default_tts_timeout_long_ms(),
            tts_timeout_short_ms: default_tts_timeout_short_ms(),
            tts_long_text_threshold: default_tts_long_text_threshold(),
            tts_backoff_rate_limited_ms: default_tts_backoff_rate_limited_ms(),
            tts_backoff_ms: default_tts_backoff_ms(),
            persist_attempts: default_persist_attempts(),
            persist_backoff_step_ms: default_persist_backoff_step_ms(),
            history_turns: default_history_turns(),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSettings {
    #[serde(default = "default_db_hosts")]
    pub hosts: Vec<String>,

    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_db_hosts() -> Vec<String> {
    vec!["127.0.0.1:9042".to_string()]
}
fn default_keyspace() -> String {
    "speaktutor".to_string()
}
fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            hosts: default_db_hosts(),
            keyspace: default_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (SPEAKTUTOR_ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("SPEAKTUTOR")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
