//! Speaking tutor server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use speaktutor_config::{load_settings, Settings};
use speaktutor_dialogue::{DialogueConfig, DialogueOrchestrator};
use speaktutor_llm::{ChatClientConfig, OpenAiChatClient};
use speaktutor_persistence::ScyllaConfig;
use speaktutor_server::{create_router, AppState};
use speaktutor_speech::{
    AzureEngineConfig, AzureSpeechEngine, OpenAiTts, SpeechEventAdapter, TtsClientConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(std::env::var("SPEAKTUTOR_ENV").ok().as_deref())?;

    init_tracing(&settings);
    tracing::info!("Starting speaktutor server v{}", env!("CARGO_PKG_VERSION"));

    // Provider clients are constructed once here and injected; nothing
    // below the router reaches for ambient globals.
    let generator = OpenAiChatClient::new(ChatClientConfig {
        base_url: settings.llm.base_url.clone(),
        api_key: settings.llm.api_key.clone(),
        model: settings.llm.model.clone(),
        max_tokens: settings.llm.max_tokens,
        temperature: settings.llm.temperature,
        request_timeout: Duration::from_millis(settings.llm.request_timeout_ms),
    })?;

    let tts = OpenAiTts::new(TtsClientConfig {
        base_url: settings.speech.tts.base_url.clone(),
        api_key: settings.speech.tts.api_key.clone(),
        model: settings.speech.tts.model.clone(),
        speed: settings.speech.tts.speed,
        request_timeout: Duration::from_millis(settings.speech.tts.request_timeout_ms),
    })?;

    let visemes = SpeechEventAdapter::new(AzureSpeechEngine::new(AzureEngineConfig {
        endpoint: settings.speech.viseme.endpoint.clone(),
        subscription_key: settings.speech.viseme.subscription_key.clone(),
        output_format: settings.speech.viseme.output_format.clone(),
    }));

    let store = speaktutor_persistence::init(ScyllaConfig {
        hosts: settings.persistence.hosts.clone(),
        keyspace: settings.persistence.keyspace.clone(),
        replication_factor: settings.persistence.replication_factor,
    })
    .await?;
    tracing::info!("Persistence layer ready");

    let orchestrator = DialogueOrchestrator::new(
        Arc::new(generator),
        Arc::new(tts),
        Arc::new(visemes),
        Arc::new(store),
        dialogue_config(&settings),
    );

    let state = AppState::new(settings.clone(), orchestrator);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Map the millisecond-based settings onto the orchestrator policy.
fn dialogue_config(settings: &Settings) -> DialogueConfig {
    let dialogue = &settings.dialogue;
    DialogueConfig {
        generation_timeout: Duration::from_millis(dialogue.generation_timeout_ms),
        viseme_timeout: Duration::from_millis(dialogue.viseme_timeout_ms),
        tts_attempts: dialogue.tts_attempts,
        tts_timeout_long: Duration::from_millis(dialogue.tts_timeout_long_ms),
        tts_timeout_short: Duration::from_millis(dialogue.tts_timeout_short_ms),
        tts_long_text_threshold: dialogue.tts_long_text_threshold,
        tts_backoff_rate_limited: Duration::from_millis(dialogue.tts_backoff_rate_limited_ms),
        tts_backoff: Duration::from_millis(dialogue.tts_backoff_ms),
        persist_attempts: dialogue.persist_attempts,
        persist_backoff_step: Duration::from_millis(dialogue.persist_backoff_step_ms),
        history_turns: dialogue.history_turns,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize tracing with an env-filter and a pretty or JSON format
/// layer, per the observability settings.
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("speaktutor={},tower_http=debug", level).into()
    });

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
