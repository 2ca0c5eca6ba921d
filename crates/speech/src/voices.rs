//! Voice catalogue
//!
//! Six synthesis voices, each with a display name the assistant
//! introduces itself with, the audio-provider voice id, and the neural
//! voice name the viseme engine expects. Unknown identifiers fall back
//! to the default voice rather than erroring, so a stale client can
//! never break a session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Synthesis voice identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceId {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl VoiceId {
    pub const DEFAULT: VoiceId = VoiceId::Alloy;

    /// Parse a client-supplied voice id, falling back to the default.
    pub fn parse(id: &str) -> Self {
        match id {
            "alloy" => VoiceId::Alloy,
            "echo" => VoiceId::Echo,
            "fable" => VoiceId::Fable,
            "onyx" => VoiceId::Onyx,
            "nova" => VoiceId::Nova,
            "shimmer" => VoiceId::Shimmer,
            _ => VoiceId::DEFAULT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceId::Alloy => "alloy",
            VoiceId::Echo => "echo",
            VoiceId::Fable => "fable",
            VoiceId::Onyx => "onyx",
            VoiceId::Nova => "nova",
            VoiceId::Shimmer => "shimmer",
        }
    }

    /// Name the assistant introduces itself with
    pub fn display_name(&self) -> &'static str {
        match self {
            VoiceId::Alloy => "Sarah",
            VoiceId::Echo => "James",
            VoiceId::Fable => "Emma",
            VoiceId::Onyx => "Michael",
            VoiceId::Nova => "Olivia",
            VoiceId::Shimmer => "Lily",
        }
    }

    /// Voice id sent to the audio TTS provider
    pub fn provider_voice(&self) -> &'static str {
        self.as_str()
    }

    /// Neural voice name sent to the viseme engine
    pub fn engine_voice(&self) -> &'static str {
        match self {
            VoiceId::Alloy => "en-US-JennyNeural",
            VoiceId::Echo => "en-US-GuyNeural",
            VoiceId::Fable => "en-US-AriaNeural",
            VoiceId::Onyx => "en-US-DavisNeural",
            VoiceId::Nova => "en-US-MichelleNeural",
            VoiceId::Shimmer => "en-US-AnaNeural",
        }
    }

    pub fn all() -> [VoiceId; 6] {
        [
            VoiceId::Alloy,
            VoiceId::Echo,
            VoiceId::Fable,
            VoiceId::Onyx,
            VoiceId::Nova,
            VoiceId::Shimmer,
        ]
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
