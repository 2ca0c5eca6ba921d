//! Viseme synthesis adapter
//!
//! The engine streams events (audio chunks, visemes, word boundaries)
//! over a channel while synthesis runs; callers want the complete,
//! ordered result. The adapter buffers everything and resolves once the
//! terminal event arrives.
//!
//! Every failure mode - connection error, cancellation, synthesis
//! error, a stream that ends without completing - resolves to an empty
//! synthesis, never an `Err`. Downstream treats "no visemes" as
//! "proceed without lip sync", not as a fatal condition.

use async_trait::async_trait;
use tokio::sync::mpsc;

use speaktutor_core::{VisemeEvent, WordBoundaryEvent};

use crate::voices::VoiceId;
use crate::SpeechError;

/// One event from an engine synthesis session
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Chunk of synthesized audio
    Audio(Vec<u8>),
    /// Viseme reached during synthesis
    Viseme(VisemeEvent),
    /// Word boundary reached during synthesis
    WordBoundary(WordBoundaryEvent),
    /// Synthesis finished successfully
    Completed,
    /// Synthesis was canceled by the engine
    Canceled(String),
    /// Synthesis failed
    Error(String),
}

/// Complete result of one synthesis session
#[derive(Debug, Clone, Default)]
pub struct VisemeSynthesis {
    pub audio: Vec<u8>,
    pub visemes: Vec<VisemeEvent>,
    pub word_boundaries: Vec<WordBoundaryEvent>,
}

impl VisemeSynthesis {
    /// The degraded no-lip-sync result
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.visemes.is_empty()
    }
}

/// Engine seam: one synthesis session per call, events pushed to the
/// supplied channel, return after the session ends.
#[async_trait]
pub trait VisemeEngine: Send + Sync {
    async fn run(
        &self,
        text: &str,
        voice: VoiceId,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), SpeechError>;
}

/// Synthesis seam consumed by the orchestrator
#[async_trait]
pub trait VisemeSynthesizer: Send + Sync {
    /// Synthesize visemes (plus audio and word boundaries) for the text.
    /// Infallible by contract: failures degrade to the empty synthesis.
    async fn synthesize_with_visemes(&self, text: &str, voice: VoiceId) -> VisemeSynthesis;
}

/// Adapter that turns an event-streaming engine into a single awaited
/// result
pub struct SpeechEventAdapter<E> {
    engine: E,
}

impl<E: VisemeEngine> SpeechEventAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<E: VisemeEngine> VisemeSynthesizer for SpeechEventAdapter<E> {
    async fn synthesize_with_visemes(&self, text: &str, voice: VoiceId) -> VisemeSynthesis {
        let (tx, mut rx) = mpsc::unbounded_channel();

        if let Err(e) = self.engine.run(text, voice, tx).await {
            tracing::warn!(voice = %voice, error = %e, "Viseme engine session failed");
            return VisemeSynthesis::empty();
        }

        let mut synthesis = VisemeSynthesis::default();
        let mut completed = false;

        while let Some(event) = rx.recv().await {
            match event {
                EngineEvent::Audio(chunk) => synthesis.audio.extend_from_slice(&chunk),
                EngineEvent::Viseme(viseme) => synthesis.visemes.push(viseme),
                EngineEvent::WordBoundary(word) => synthesis.word_boundaries.push(word),
                EngineEvent::Completed => completed = true,
                EngineEvent::Canceled(reason) => {
                    tracing::warn!(voice = %voice, reason = %reason, "Viseme synthesis canceled");
                    return VisemeSynthesis::empty();
                }
                EngineEvent::Error(message) => {
                    tracing::warn!(voice = %voice, error = %message, "Viseme synthesis failed");
                    return VisemeSynthesis::empty();
                }
            }
        }

        if !completed {
            tracing::warn!(voice = %voice, "Viseme engine ended without completing");
            return VisemeSynthesis::empty();
        }

        tracing::debug!(
            voice = %voice,
            visemes = synthesis.visemes.len(),
            words = synthesis.word_boundaries.len(),
            audio_bytes = synthesis.audio.len(),
            "Viseme synthesis complete"
        );

        synthesis
    }
}
