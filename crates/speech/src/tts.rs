//! Audio text-to-speech client
//!
//! One HTTP round trip per synthesis: text in, encoded audio bytes out.
//! Retry policy belongs to the caller; this client makes exactly one
//! attempt per call and classifies failures so the caller can pick the
//! right backoff.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;

use crate::voices::VoiceId;
use crate::SpeechError;

/// Audio synthesis seam
#[async_trait]
pub trait AudioSynthesizer: Send + Sync {
    /// Synthesize speech audio for the given text. One attempt.
    async fn synthesize(&self, text: &str, voice: VoiceId) -> Result<Vec<u8>, SpeechError>;
}

/// Audio TTS client configuration
#[derive(Debug, Clone)]
pub struct TtsClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub speed: f32,
    /// Backstop timeout, above the caller's per-attempt deadline
    pub request_timeout: Duration,
}

impl Default for TtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "tts-1".to_string(),
            speed: 1.0,
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Speech client for OpenAI-compatible audio endpoints
pub struct OpenAiTts {
    http: reqwest::Client,
    config: TtsClientConfig,
}

impl OpenAiTts {
    pub fn new(config: TtsClientConfig) -> Result<Self, SpeechError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SpeechError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    speed: f32,
}

#[async_trait]
impl AudioSynthesizer for OpenAiTts {
    async fn synthesize(&self, text: &str, voice: VoiceId) -> Result<Vec<u8>, SpeechError> {
        let started = Instant::now();

        let response = self
            .http
            .post(format!("{}/audio/speech", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&SpeechRequest {
                model: &self.config.model,
                voice: voice.provider_voice(),
                input: text,
                speed: self.config.speed,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SpeechError::Timeout
                } else {
                    SpeechError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SpeechError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Request(e.to_string()))?;

        tracing::debug!(
            voice = %voice,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Audio synthesis finished"
        );

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TtsClientConfig::default();
        assert_eq!(config.model, "tts-1");
        assert_eq!(config.speed, 1.0);
    }

    #[test]
    fn test_request_serialization_matches_wire_format() {
        let request = SpeechRequest {
            model: "tts-1",
            voice: VoiceId::Nova.provider_voice(),
            input: "Hello there",
            speed: 1.0,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "tts-1");
        assert_eq!(json["voice"], "nova");
        assert_eq!(json["input"], "Hello there");
        assert_eq!(json["speed"], 1.0);
    }

    #[test]
    fn test_rate_limit_classification() {
        assert!(SpeechError::RateLimited.is_rate_limited());
        assert!(!SpeechError::Timeout.is_rate_limited());
    }
}
