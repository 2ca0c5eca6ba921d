//! Integration tests for the respond flow
//!
//! Exercise the orchestrator end to end against mock providers: the
//! happy path, every degrade path, the timeout race, and the
//! optimistic-persistence retry.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use speaktutor_core::{TurnRole, VisemeEvent, WordBoundaryEvent};
use speaktutor_dialogue::{DialogueConfig, DialogueError, DialogueOrchestrator, RespondRequest};
use speaktutor_llm::{LlmError, Message, TextGenerator};
use speaktutor_persistence::{
    InMemorySessionStore, PersistenceError, SessionDocument, SessionStore,
};
use speaktutor_speech::{
    AudioSynthesizer, SpeechError, VisemeSynthesis, VisemeSynthesizer, VoiceId,
};

// ---------------------------------------------------------------------------
// Mock providers
// ---------------------------------------------------------------------------

struct FixedGenerator {
    text: String,
    calls: AtomicU32,
    seen: Mutex<Vec<Message>>,
}

impl FixedGenerator {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock() = messages.to_vec();
        Ok(self.text.clone())
    }
}

/// Never resolves; the orchestrator's deadline has to cut it off.
struct HangingGenerator;

#[async_trait]
impl TextGenerator for HangingGenerator {
    async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
        std::future::pending().await
    }
}

struct FixedTts {
    audio: Vec<u8>,
}

#[async_trait]
impl AudioSynthesizer for FixedTts {
    async fn synthesize(&self, _text: &str, _voice: VoiceId) -> Result<Vec<u8>, SpeechError> {
        Ok(self.audio.clone())
    }
}

struct FailingTts {
    rate_limited: bool,
    attempts: AtomicU32,
}

impl FailingTts {
    fn new(rate_limited: bool) -> Self {
        Self {
            rate_limited,
            attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl AudioSynthesizer for FailingTts {
    async fn synthesize(&self, _text: &str, _voice: VoiceId) -> Result<Vec<u8>, SpeechError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited {
            Err(SpeechError::RateLimited)
        } else {
            Err(SpeechError::Request("boom".to_string()))
        }
    }
}

struct FixedVisemes {
    visemes: Vec<VisemeEvent>,
}

#[async_trait]
impl VisemeSynthesizer for FixedVisemes {
    async fn synthesize_with_visemes(&self, _text: &str, _voice: VoiceId) -> VisemeSynthesis {
        VisemeSynthesis {
            audio: Vec::new(),
            visemes: self.visemes.clone(),
            word_boundaries: vec![WordBoundaryEvent {
                word: "hello".to_string(),
                offset: 0,
                duration: 300,
            }],
        }
    }
}

/// Slower than the viseme deadline; must degrade, not stall.
struct SlowVisemes;

#[async_trait]
impl VisemeSynthesizer for SlowVisemes {
    async fn synthesize_with_visemes(&self, _text: &str, _voice: VoiceId) -> VisemeSynthesis {
        tokio::time::sleep(Duration::from_secs(300)).await;
        VisemeSynthesis::empty()
    }
}

/// Store wrapper that forces version conflicts on the first N saves.
struct ConflictingStore {
    inner: InMemorySessionStore,
    conflicts_remaining: AtomicU32,
    save_attempts: AtomicU32,
}

impl ConflictingStore {
    fn new(conflicts: u32) -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            conflicts_remaining: AtomicU32::new(conflicts),
            save_attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SessionStore for ConflictingStore {
    async fn create(&self, session: &SessionDocument) -> Result<(), PersistenceError> {
        self.inner.create(session).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SessionDocument>, PersistenceError> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, session: &SessionDocument) -> Result<(), PersistenceError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PersistenceError::VersionConflict(session.id.clone()));
        }
        self.inner.save(session).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn restaurant_request() -> RespondRequest {
    RespondRequest {
        speaking_session_id: Some("s-1".to_string()),
        user_input: Some("I'd like a table".to_string()),
        scenario: Some("restaurant".to_string()),
        level: Some("B1".to_string()),
        voice: Some("alloy".to_string()),
        is_initial: false,
        potential_grammar_errors: None,
        user_name: None,
    }
}

fn sample_visemes() -> Vec<VisemeEvent> {
    vec![
        VisemeEvent::new(1, 0, 0),
        VisemeEvent::new(5, 250, 0),
        VisemeEvent::new(9, 900, 0),
    ]
}

async fn store_with_session() -> Arc<InMemorySessionStore> {
    let store = Arc::new(InMemorySessionStore::new());
    store.create(&SessionDocument::new("s-1")).await.unwrap();
    store
}

fn orchestrator(
    generator: Arc<dyn TextGenerator>,
    tts: Arc<dyn AudioSynthesizer>,
    visemes: Arc<dyn VisemeSynthesizer>,
    store: Arc<dyn SessionStore>,
) -> DialogueOrchestrator {
    DialogueOrchestrator::new(generator, tts, visemes, store, DialogueConfig::default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_turn_appends_user_and_assistant_entries() {
    let store = store_with_session().await;
    let generator = Arc::new(FixedGenerator::new("Of course, a table for how many?"));

    let orchestrator = orchestrator(
        generator.clone(),
        Arc::new(FixedTts {
            audio: vec![1, 2, 3],
        }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store.clone(),
    );

    let response = orchestrator.respond(&restaurant_request()).await.unwrap();

    assert_eq!(response.text, "Of course, a table for how many?");
    assert_eq!(response.role, TurnRole::Assistant);
    assert!(response
        .audio_url
        .as_deref()
        .unwrap()
        .starts_with("data:audio/mpeg;base64,"));
    assert!(!response.facial_animation_data.visemes.is_empty());

    let session = store.find_by_id("s-1").await.unwrap().unwrap();
    assert_eq!(session.transcript.len(), 2);
    assert_eq!(session.transcript[0].role, TurnRole::User);
    assert_eq!(session.transcript[0].text, "I'd like a table");
    assert_eq!(session.transcript[1].role, TurnRole::Assistant);

    // The scenario prompt was built once and cached on the document.
    let prompt = session.metadata.get("systemPrompt").unwrap();
    assert!(prompt.contains("restaurant server"));

    // And it is what the generator actually saw.
    let seen = generator.seen.lock();
    assert!(seen[0].content.contains("restaurant server"));
    assert_eq!(seen.last().unwrap().content, "I'd like a table");
}

#[tokio::test]
async fn test_initial_greeting_bypasses_generator() {
    let store = store_with_session().await;
    let generator = Arc::new(FixedGenerator::new("should never be used"));

    let orchestrator = orchestrator(
        generator.clone(),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store.clone(),
    );

    let request = RespondRequest {
        speaking_session_id: Some("s-1".to_string()),
        scenario: Some("free".to_string()),
        level: Some("A2".to_string()),
        voice: Some("alloy".to_string()),
        is_initial: true,
        user_name: Some("Maria".to_string()),
        ..Default::default()
    };

    let response = orchestrator.respond(&request).await.unwrap();

    assert_eq!(
        response.text,
        "Hi, Maria. I am Sarah. I am your speaking assistant today. \
         What would you like to talk about?"
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    let session = store.find_by_id("s-1").await.unwrap().unwrap();
    assert_eq!(session.transcript.len(), 1);
    assert_eq!(session.transcript[0].role, TurnRole::Assistant);
}

#[tokio::test]
async fn test_tts_exhaustion_degrades_to_null_audio() {
    let store = store_with_session().await;
    let tts = Arc::new(FailingTts::new(false));

    let orchestrator = orchestrator(
        Arc::new(FixedGenerator::new("Certainly.")),
        tts.clone(),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store,
    );

    let response = orchestrator.respond(&restaurant_request()).await.unwrap();

    assert_eq!(tts.attempts.load(Ordering::SeqCst), 2);
    assert!(response.audio_url.is_none());
    assert_eq!(response.text, "Certainly.");
    assert!(!response.facial_animation_data.visemes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_backoff_before_retry() {
    let store = store_with_session().await;
    let tts = Arc::new(FailingTts::new(true));

    let orchestrator = orchestrator(
        Arc::new(FixedGenerator::new("Certainly.")),
        tts.clone(),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store,
    );

    let started = tokio::time::Instant::now();
    let response = orchestrator.respond(&restaurant_request()).await.unwrap();

    assert_eq!(tts.attempts.load(Ordering::SeqCst), 2);
    assert!(response.audio_url.is_none());
    // The rate-limit backoff (1500ms) separated the two attempts.
    assert!(started.elapsed() >= Duration::from_millis(1_500));
}

#[tokio::test(start_paused = true)]
async fn test_generation_timeout_fails_the_request_in_bounded_time() {
    let store = store_with_session().await;

    let orchestrator = orchestrator(
        Arc::new(HangingGenerator),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store.clone(),
    );

    let started = tokio::time::Instant::now();
    let error = orchestrator
        .respond(&restaurant_request())
        .await
        .unwrap_err();

    assert!(matches!(error, DialogueError::Generation));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(12));
    assert!(elapsed < Duration::from_secs(13));

    // A failed generation persists nothing.
    let session = store.find_by_id("s-1").await.unwrap().unwrap();
    assert!(session.transcript.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_visemes_degrade_to_empty_animation() {
    let store = store_with_session().await;

    let orchestrator = orchestrator(
        Arc::new(FixedGenerator::new("Certainly.")),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(SlowVisemes),
        store,
    );

    let response = orchestrator.respond(&restaurant_request()).await.unwrap();

    assert!(response.facial_animation_data.is_empty());
    assert!(response.audio_url.is_some());
    assert_eq!(response.text, "Certainly.");
}

#[tokio::test(start_paused = true)]
async fn test_version_conflict_resolves_on_third_attempt() {
    let store = Arc::new(ConflictingStore::new(2));
    store.create(&SessionDocument::new("s-1")).await.unwrap();

    let orchestrator = orchestrator(
        Arc::new(FixedGenerator::new("Certainly.")),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store.clone(),
    );

    let response = orchestrator.respond(&restaurant_request()).await.unwrap();
    assert_eq!(response.text, "Certainly.");

    assert_eq!(store.save_attempts.load(Ordering::SeqCst), 3);
    let session = store.find_by_id("s-1").await.unwrap().unwrap();
    // Appended exactly once: no duplicates from the retries, no loss.
    assert_eq!(session.transcript.len(), 2);
    assert_eq!(session.transcript[1].role, TurnRole::Assistant);
}

#[tokio::test]
async fn test_persistence_exhaustion_still_returns_the_response() {
    let store = Arc::new(ConflictingStore::new(u32::MAX));
    store.create(&SessionDocument::new("s-1")).await.unwrap();

    let orchestrator = DialogueOrchestrator::new(
        Arc::new(FixedGenerator::new("Certainly.")),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store.clone(),
        DialogueConfig {
            persist_backoff_step: Duration::from_millis(1),
            ..Default::default()
        },
    );

    let response = orchestrator.respond(&restaurant_request()).await.unwrap();
    assert_eq!(response.text, "Certainly.");
    assert_eq!(store.save_attempts.load(Ordering::SeqCst), 3);

    let session = store.find_by_id("s-1").await.unwrap().unwrap();
    assert!(session.transcript.is_empty());
}

#[tokio::test]
async fn test_cached_system_prompt_is_reused_verbatim() {
    let store = Arc::new(InMemorySessionStore::new());
    let mut session = SessionDocument::new("s-1");
    session.set_system_prompt_if_absent("CUSTOM CACHED PROMPT");
    store.create(&session).await.unwrap();

    let generator = Arc::new(FixedGenerator::new("Sure."));
    let orchestrator = orchestrator(
        generator.clone(),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store.clone(),
    );

    orchestrator.respond(&restaurant_request()).await.unwrap();

    let seen = generator.seen.lock();
    assert_eq!(seen[0].content, "CUSTOM CACHED PROMPT");

    let session = store.find_by_id("s-1").await.unwrap().unwrap();
    assert_eq!(
        session.metadata.get("systemPrompt").unwrap(),
        "CUSTOM CACHED PROMPT"
    );
}

#[tokio::test]
async fn test_grammar_hints_reach_the_prompt() {
    let store = store_with_session().await;
    let generator = Arc::new(FixedGenerator::new("Sure."));

    let orchestrator = orchestrator(
        generator.clone(),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store,
    );

    let mut request = restaurant_request();
    request.potential_grammar_errors = Some(serde_json::json!(
        [{"pattern": "I goed", "possibleError": "use 'went'"}]
    ));
    orchestrator.respond(&request).await.unwrap();

    let seen = generator.seen.lock();
    assert!(seen.iter().any(|m| m.content.contains("I goed")));
}

#[tokio::test]
async fn test_malformed_grammar_hints_are_swallowed() {
    let store = store_with_session().await;
    let generator = Arc::new(FixedGenerator::new("Sure."));

    let orchestrator = orchestrator(
        generator.clone(),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store,
    );

    let mut request = restaurant_request();
    request.potential_grammar_errors = Some(serde_json::json!("{{{ not json"));
    let response = orchestrator.respond(&request).await.unwrap();
    assert_eq!(response.text, "Sure.");

    let seen = generator.seen.lock();
    // system prompt + user message only; no grammar note.
    assert_eq!(seen.len(), 2);
}

#[tokio::test]
async fn test_missing_required_fields_are_rejected() {
    let store = store_with_session().await;
    let orchestrator = orchestrator(
        Arc::new(FixedGenerator::new("Sure.")),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store,
    );

    let mut request = restaurant_request();
    request.scenario = None;
    let error = orchestrator.respond(&request).await.unwrap_err();
    assert!(matches!(error, DialogueError::MissingField("scenario")));

    let mut request = restaurant_request();
    request.speaking_session_id = None;
    let error = orchestrator.respond(&request).await.unwrap_err();
    assert!(matches!(
        error,
        DialogueError::MissingField("speakingSessionId")
    ));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let orchestrator = orchestrator(
        Arc::new(FixedGenerator::new("Sure.")),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        Arc::new(InMemorySessionStore::new()),
    );

    let error = orchestrator
        .respond(&restaurant_request())
        .await
        .unwrap_err();
    assert!(matches!(error, DialogueError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_unknown_voice_falls_back_to_default_assistant() {
    let store = store_with_session().await;
    let orchestrator = orchestrator(
        Arc::new(FixedGenerator::new("unused")),
        Arc::new(FixedTts { audio: vec![1] }),
        Arc::new(FixedVisemes {
            visemes: sample_visemes(),
        }),
        store,
    );

    let request = RespondRequest {
        speaking_session_id: Some("s-1".to_string()),
        scenario: Some("free".to_string()),
        level: Some("A1".to_string()),
        voice: Some("definitely-not-a-voice".to_string()),
        is_initial: true,
        user_name: Some("Maria".to_string()),
        ..Default::default()
    };

    let response = orchestrator.respond(&request).await.unwrap();
    // Unknown voices fall back to the default voice's assistant.
    assert!(response.text.contains("I am Sarah"));
}
