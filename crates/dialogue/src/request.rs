//! Request and response payloads for the respond endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

use speaktutor_core::{FacialAnimationData, TurnRole};

/// Inbound speaking-turn request
///
/// Required fields are modelled as options so a missing field becomes a
/// 400 with a named field rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    #[serde(default)]
    pub speaking_session_id: Option<String>,

    /// Absent on the initial turn
    #[serde(default)]
    pub user_input: Option<String>,

    #[serde(default)]
    pub scenario: Option<String>,

    /// CEFR level (A1-C2)
    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub voice: Option<String>,

    #[serde(default)]
    pub is_initial: bool,

    /// JSON string or array of `{pattern, possibleError}` objects
    #[serde(default)]
    pub potential_grammar_errors: Option<Value>,

    #[serde(default)]
    pub user_name: Option<String>,
}

/// Outbound speaking-turn response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondResponse {
    pub text: String,
    pub role: TurnRole,
    /// `data:audio/mpeg;base64,...` or null when audio degraded
    pub audio_url: Option<String>,
    pub facial_animation_data: FacialAnimationData,
}
