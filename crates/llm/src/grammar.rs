//! Grammar-error hints
//!
//! Upstream detection sends best-effort `{pattern, possibleError}` pairs,
//! either as a JSON string or an already-parsed array. Parsing is
//! tolerant: anything malformed yields no hints, and the turn proceeds
//! without a grammar note.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A detected grammar-error candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarHint {
    pub pattern: String,
    pub possible_error: String,
}

/// Parse grammar hints out of an inbound payload field.
pub fn parse_hints(value: &Value) -> Vec<GrammarHint> {
    let parsed = match value {
        Value::String(raw) => serde_json::from_str::<Vec<GrammarHint>>(raw).ok(),
        Value::Array(_) => serde_json::from_value::<Vec<GrammarHint>>(value.clone()).ok(),
        _ => None,
    };

    match parsed {
        Some(hints) => hints,
        None => {
            tracing::debug!("Unparseable grammar hints, proceeding without a note");
            Vec::new()
        }
    }
}
