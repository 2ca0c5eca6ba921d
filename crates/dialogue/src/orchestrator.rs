//! Dialogue orchestrator
//!
//! Drives one speaking turn end to end: load the session, build the
//! prompt, generate text under a hard deadline, fan out audio TTS and
//! viseme synthesis concurrently, assemble the animation payload, and
//! append the new turns under optimistic concurrency.
//!
//! Failure policy per step:
//! - text generation: fatal on timeout or error, no fallback text
//! - viseme synthesis: degrades to an empty animation payload
//! - audio TTS: bounded retry, then degrades to a null audio URL
//! - persistence: bounded retry on version conflicts, then logged and
//!   swallowed - a stored transcript must not mask a successful
//!   generation

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::time::{sleep, timeout};

use speaktutor_animation::{compose, process};
use speaktutor_core::{ConversationTurn, FacialAnimationData, TurnRole};
use speaktutor_llm::{
    build_system_prompt, parse_hints, PromptBuilder, ResponseTemplates, TextGenerator,
};
use speaktutor_persistence::{SessionDocument, SessionStore};
use speaktutor_speech::{AudioSynthesizer, VisemeSynthesis, VisemeSynthesizer, VoiceId};

use crate::request::{RespondRequest, RespondResponse};
use crate::DialogueError;

/// Orchestration policy
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    /// Hard deadline for text generation; a timeout fails the request
    pub generation_timeout: Duration,
    /// Deadline for viseme synthesis; a timeout degrades to no lip sync
    pub viseme_timeout: Duration,
    /// Total audio TTS attempts
    pub tts_attempts: u32,
    /// Per-attempt TTS deadline for long responses
    pub tts_timeout_long: Duration,
    /// Per-attempt TTS deadline for short responses
    pub tts_timeout_short: Duration,
    /// Response length (chars) above which the long deadline applies
    pub tts_long_text_threshold: usize,
    /// Backoff before the retry after a rate-limit class failure
    pub tts_backoff_rate_limited: Duration,
    /// Backoff before the retry after any other failure
    pub tts_backoff: Duration,
    /// Total save attempts when the session document races
    pub persist_attempts: u32,
    /// Save backoff grows linearly: step times the attempt number
    pub persist_backoff_step: Duration,
    /// Transcript turns included in the prompt (six exchanges)
    pub history_turns: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(12),
            viseme_timeout: Duration::from_secs(12),
            tts_attempts: 2,
            tts_timeout_long: Duration::from_secs(12),
            tts_timeout_short: Duration::from_secs(8),
            tts_long_text_threshold: 60,
            tts_backoff_rate_limited: Duration::from_millis(1_500),
            tts_backoff: Duration::from_millis(500),
            persist_attempts: 3,
            persist_backoff_step: Duration::from_millis(100),
            history_turns: 12,
        }
    }
}

/// Per-request dialogue orchestrator
///
/// Provider clients are injected at construction; nothing here reaches
/// for ambient globals, so tests substitute fakes freely.
pub struct DialogueOrchestrator {
    generator: Arc<dyn TextGenerator>,
    tts: Arc<dyn AudioSynthesizer>,
    visemes: Arc<dyn VisemeSynthesizer>,
    store: Arc<dyn SessionStore>,
    config: DialogueConfig,
}

impl DialogueOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        tts: Arc<dyn AudioSynthesizer>,
        visemes: Arc<dyn VisemeSynthesizer>,
        store: Arc<dyn SessionStore>,
        config: DialogueConfig,
    ) -> Self {
        Self {
            generator,
            tts,
            visemes,
            store,
            config,
        }
    }

    /// Handle one speaking turn.
    pub async fn respond(&self, request: &RespondRequest) -> Result<RespondResponse, DialogueError> {
        let session_id = required(&request.speaking_session_id, "speakingSessionId")?;
        let scenario = required(&request.scenario, "scenario")?.to_string();
        let level = required(&request.level, "level")?.to_string();
        let voice = VoiceId::parse(request.voice.as_deref().unwrap_or_default());

        let session = self
            .store
            .find_by_id(&session_id)
            .await?
            .ok_or_else(|| DialogueError::SessionNotFound(session_id.clone()))?;

        if request.is_initial && scenario == "free" {
            self.initial_greeting(session, voice, request).await
        } else {
            self.conversation_turn(session, &scenario, &level, voice, request)
                .await
        }
    }

    /// Initial free-conversation turn: the greeting text is fixed, so
    /// speech and viseme synthesis start together with no generation
    /// step at all.
    async fn initial_greeting(
        &self,
        session: SessionDocument,
        voice: VoiceId,
        request: &RespondRequest,
    ) -> Result<RespondResponse, DialogueError> {
        let first_name = first_name(request.user_name.as_deref());
        let text =
            ResponseTemplates::free_conversation_greeting(voice.display_name(), &first_name);

        tracing::info!(session_id = %session.id, voice = %voice, "Starting initial greeting turn");

        let (audio_url, synthesis) = tokio::join!(
            self.synthesize_audio(&text, voice),
            self.synthesize_visemes(&text, voice),
        );
        let facial_animation_data = assemble_animation(&text, synthesis);

        self.persist_turns(&session.id, None, ConversationTurn::assistant(&text), None)
            .await;

        Ok(RespondResponse {
            text,
            role: TurnRole::Assistant,
            audio_url,
            facial_animation_data,
        })
    }

    /// Normal conversation turn: generate text first (the synthesis
    /// steps depend on it), then fan out speech and visemes together.
    async fn conversation_turn(
        &self,
        session: SessionDocument,
        scenario: &str,
        level: &str,
        voice: VoiceId,
        request: &RespondRequest,
    ) -> Result<RespondResponse, DialogueError> {
        let user_input = request.user_input.clone().unwrap_or_default();

        // The system prompt is computed once per session and cached on
        // the document; recomputing it would shift the assistant's
        // persona mid-conversation.
        let (system_prompt, fresh_prompt) = match session.system_prompt() {
            Some(cached) => (cached.to_string(), None),
            None => {
                let built =
                    build_system_prompt(scenario, level, request.is_initial, voice.display_name());
                (built.clone(), Some(built))
            }
        };

        let hints = request
            .potential_grammar_errors
            .as_ref()
            .map(parse_hints)
            .unwrap_or_default();

        let messages = PromptBuilder::new()
            .with_system_prompt(&system_prompt)
            .with_history(session.last_turns(self.config.history_turns), self.config.history_turns)
            .with_grammar_note(&hints)
            .user_message(&user_input)
            .build();

        let text = match timeout(
            self.config.generation_timeout,
            self.generator.complete(&messages),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::error!(session_id = %session.id, error = %e, "Text generation failed");
                return Err(DialogueError::Generation);
            }
            Err(_) => {
                tracing::error!(
                    session_id = %session.id,
                    timeout_ms = self.config.generation_timeout.as_millis() as u64,
                    "Text generation timed out"
                );
                return Err(DialogueError::Generation);
            }
        };

        let (audio_url, synthesis) = tokio::join!(
            self.synthesize_audio(&text, voice),
            self.synthesize_visemes(&text, voice),
        );
        let facial_animation_data = assemble_animation(&text, synthesis);

        let user_turn = (!user_input.is_empty()).then(|| ConversationTurn::user(&user_input));
        self.persist_turns(
            &session.id,
            user_turn,
            ConversationTurn::assistant(&text),
            fresh_prompt.as_deref(),
        )
        .await;

        Ok(RespondResponse {
            text,
            role: TurnRole::Assistant,
            audio_url,
            facial_animation_data,
        })
    }

    /// Audio TTS with bounded retry and an adaptive per-attempt
    /// deadline. Exhaustion degrades to no audio.
    async fn synthesize_audio(&self, text: &str, voice: VoiceId) -> Option<String> {
        let deadline = if text.len() > self.config.tts_long_text_threshold {
            self.config.tts_timeout_long
        } else {
            self.config.tts_timeout_short
        };

        for attempt in 1..=self.config.tts_attempts {
            match timeout(deadline, self.tts.synthesize(text, voice)).await {
                Ok(Ok(bytes)) => {
                    tracing::debug!(attempt, bytes = bytes.len(), "Audio synthesis succeeded");
                    return Some(format!("data:audio/mpeg;base64,{}", BASE64.encode(&bytes)));
                }
                Ok(Err(e)) => {
                    tracing::warn!(attempt, error = %e, "Audio synthesis attempt failed");
                    if attempt < self.config.tts_attempts {
                        let backoff = if e.is_rate_limited() {
                            self.config.tts_backoff_rate_limited
                        } else {
                            self.config.tts_backoff
                        };
                        sleep(backoff).await;
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        attempt,
                        deadline_ms = deadline.as_millis() as u64,
                        "Audio synthesis attempt timed out"
                    );
                    if attempt < self.config.tts_attempts {
                        sleep(self.config.tts_backoff).await;
                    }
                }
            }
        }

        tracing::warn!(voice = %voice, "Audio synthesis exhausted, responding without audio");
        None
    }

    /// Viseme synthesis bounded by its own deadline. A slow engine
    /// degrades to no lip sync rather than stalling the response.
    async fn synthesize_visemes(&self, text: &str, voice: VoiceId) -> VisemeSynthesis {
        match timeout(
            self.config.viseme_timeout,
            self.visemes.synthesize_with_visemes(text, voice),
        )
        .await
        {
            Ok(synthesis) => synthesis,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.viseme_timeout.as_millis() as u64,
                    "Viseme synthesis timed out"
                );
                VisemeSynthesis::empty()
            }
        }
    }

    /// Append the new turns under optimistic concurrency. The session
    /// is re-read before every attempt so a write never starts from a
    /// stale copy; the retry loop is the only defense against racing
    /// turns on one session.
    async fn persist_turns(
        &self,
        session_id: &str,
        user_turn: Option<ConversationTurn>,
        assistant_turn: ConversationTurn,
        system_prompt: Option<&str>,
    ) {
        for attempt in 1..=self.config.persist_attempts {
            let mut session = match self.store.find_by_id(session_id).await {
                Ok(Some(session)) => session,
                Ok(None) => {
                    tracing::error!(session_id, "Session disappeared before save");
                    return;
                }
                Err(e) => {
                    tracing::error!(session_id, attempt, error = %e, "Session reload failed");
                    return;
                }
            };

            if let Some(prompt) = system_prompt {
                session.set_system_prompt_if_absent(prompt);
            }
            if let Some(turn) = user_turn.clone() {
                session.push_turn(turn);
            }
            session.push_turn(assistant_turn.clone());

            match self.store.save(&session).await {
                Ok(()) => {
                    tracing::debug!(
                        session_id,
                        attempt,
                        turns = session.transcript.len(),
                        "Transcript saved"
                    );
                    return;
                }
                Err(e) if e.is_version_conflict() && attempt < self.config.persist_attempts => {
                    tracing::warn!(session_id, attempt, "Version conflict on save, retrying");
                    sleep(self.config.persist_backoff_step * attempt).await;
                }
                Err(e) => {
                    tracing::error!(
                        session_id,
                        attempt,
                        error = %e,
                        "Failed to persist transcript; returning generation result anyway"
                    );
                    return;
                }
            }
        }
    }
}

/// Derive the animation payload from whatever viseme data arrived;
/// empty input stays empty all the way through.
fn assemble_animation(text: &str, synthesis: VisemeSynthesis) -> FacialAnimationData {
    let processed = process(&synthesis.visemes);
    compose(text, &processed)
}

fn required(field: &Option<String>, name: &'static str) -> Result<String, DialogueError> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(DialogueError::MissingField(name)),
    }
}

/// First whitespace-separated name, for the greeting template.
fn first_name(user_name: Option<&str>) -> String {
    user_name
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or("there")
        .to_string()
}
