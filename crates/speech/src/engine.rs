//! Neural speech engine session
//!
//! Speaks the engine's websocket protocol: one connection per synthesis,
//! an SSML request up front, then a stream of JSON event messages
//! (visemes, word boundaries, base64 audio) until a terminal message.
//! Binary frames carry raw audio on engines that support it.
//!
//! The engine only reports what the wire said; the empty-on-failure
//! policy lives in the adapter above it.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use speaktutor_core::{VisemeEvent, WordBoundaryEvent};

use crate::viseme::{EngineEvent, VisemeEngine};
use crate::voices::VoiceId;
use crate::SpeechError;

/// Engine connection configuration
#[derive(Debug, Clone)]
pub struct AzureEngineConfig {
    /// Websocket endpoint, e.g. `wss://<region>.tts.speech.microsoft.com/synthesis`
    pub endpoint: String,
    pub subscription_key: String,
    pub output_format: String,
}

impl Default for AzureEngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://eastus.tts.speech.microsoft.com/synthesis".to_string(),
            subscription_key: String::new(),
            output_format: "audio-16khz-64kbitrate-mono-mp3".to_string(),
        }
    }
}

/// Azure-style neural speech engine over websocket
pub struct AzureSpeechEngine {
    config: AzureEngineConfig,
}

impl AzureSpeechEngine {
    pub fn new(config: AzureEngineConfig) -> Self {
        Self { config }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisRequest<'a> {
    ssml: String,
    output_format: &'a str,
}

/// JSON event message from the engine
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum EngineMessage {
    Viseme {
        viseme_id: u32,
        audio_offset: u64,
    },
    WordBoundary {
        text: String,
        audio_offset: u64,
        #[serde(default)]
        duration: u64,
    },
    Audio {
        data: String,
    },
    Completed,
    Canceled {
        #[serde(default)]
        reason: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

#[async_trait]
impl VisemeEngine for AzureSpeechEngine {
    async fn run(
        &self,
        text: &str,
        voice: VoiceId,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), SpeechError> {
        let mut request = self
            .config
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| SpeechError::Engine(e.to_string()))?;
        request.headers_mut().insert(
            "Ocp-Apim-Subscription-Key",
            HeaderValue::from_str(&self.config.subscription_key)
                .map_err(|e| SpeechError::Engine(e.to_string()))?,
        );

        let (ws, _) = connect_async(request)
            .await
            .map_err(|e| SpeechError::Engine(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let synthesis_request = SynthesisRequest {
            ssml: build_ssml(text, voice.engine_voice()),
            output_format: &self.config.output_format,
        };
        let payload = serde_json::to_string(&synthesis_request)
            .map_err(|e| SpeechError::Engine(e.to_string()))?;
        sink.send(WsMessage::Text(payload))
            .await
            .map_err(|e| SpeechError::Engine(e.to_string()))?;

        while let Some(message) = stream.next().await {
            let message = message.map_err(|e| SpeechError::Engine(e.to_string()))?;
            match message {
                WsMessage::Text(payload) => {
                    let parsed: EngineMessage = match serde_json::from_str(&payload) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            let _ = events
                                .send(EngineEvent::Error(format!("malformed message: {e}")));
                            break;
                        }
                    };

                    let terminal = matches!(
                        &parsed,
                        EngineMessage::Completed
                            | EngineMessage::Canceled { .. }
                            | EngineMessage::Error { .. }
                    );
                    match parsed {
                        EngineMessage::Viseme {
                            viseme_id,
                            audio_offset,
                        } => {
                            let _ = events.send(EngineEvent::Viseme(VisemeEvent::new(
                                viseme_id,
                                audio_offset,
                                0,
                            )));
                        }
                        EngineMessage::WordBoundary {
                            text,
                            audio_offset,
                            duration,
                        } => {
                            let _ = events.send(EngineEvent::WordBoundary(WordBoundaryEvent {
                                word: text,
                                offset: audio_offset,
                                duration,
                            }));
                        }
                        EngineMessage::Audio { data } => match BASE64.decode(&data) {
                            Ok(audio) => {
                                let _ = events.send(EngineEvent::Audio(audio));
                            }
                            Err(e) => {
                                let _ = events
                                    .send(EngineEvent::Error(format!("bad audio payload: {e}")));
                                break;
                            }
                        },
                        EngineMessage::Completed => {
                            let _ = events.send(EngineEvent::Completed);
                        }
                        EngineMessage::Canceled { reason } => {
                            let _ = events.send(EngineEvent::Canceled(reason));
                        }
                        EngineMessage::Error { message } => {
                            let _ = events.send(EngineEvent::Error(message));
                        }
                    }
                    if terminal {
                        break;
                    }
                }
                WsMessage::Binary(audio) => {
                    let _ = events.send(EngineEvent::Audio(audio));
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }

        Ok(())
    }
}

fn build_ssml(text: &str, engine_voice: &str) -> String {
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='en-US'>\
         <voice name='{}'>{}</voice></speak>",
        engine_voice,
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}
