//! Chat-completion client
//!
//! Thin client over an OpenAI-compatible chat endpoint. The caller owns
//! the race-against-deadline; the client's own timeout is only a
//! backstop so an abandoned call cannot hold a connection forever.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::prompt::Message;
use crate::LlmError;

/// Text generation seam
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate one completion for the given message list.
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Backstop timeout, above the caller's deadline
    pub request_timeout: Duration,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 120,
            temperature: 0.7,
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Chat-completion client for OpenAI-compatible endpoints
pub struct OpenAiChatClient {
    http: reqwest::Client,
    config: ChatClientConfig,
}

impl OpenAiChatClient {
    pub fn new(config: ChatClientConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiChatClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let started = Instant::now();

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&ChatRequest {
                model: &self.config.model,
                messages,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Chat completion request failed");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "Chat completion finished"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChatClientConfig::default();
        assert_eq!(config.max_tokens, 120);
        assert_eq!(config.temperature, 0.7);
    }

    #[test]
    fn test_request_serialization_matches_wire_format() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            max_tokens: 120,
            temperature: 0.7,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 120);
    }
}
