//! Prompt construction and text generation
//!
//! Builds chat prompts for speaking practice sessions (scenario role,
//! learner level, rolling history, grammar hints) and provides the
//! chat-completion client behind the [`TextGenerator`] seam.

pub mod client;
pub mod grammar;
pub mod prompt;

pub use client::{ChatClientConfig, OpenAiChatClient, TextGenerator};
pub use grammar::{parse_hints, GrammarHint};
pub use prompt::{build_system_prompt, Message, PromptBuilder, ResponseTemplates, Role};

use thiserror::Error;

/// Text generation errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("client construction failed: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("completion was empty")]
    EmptyCompletion,
}
