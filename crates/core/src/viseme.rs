//! Viseme and word-boundary event types
//!
//! A viseme is the visual mouth shape corresponding to a phoneme. The
//! synthesis engine reports visemes as timestamped events during
//! synthesis; durations on raw events are placeholders and are
//! recomputed by the key-framing transform before rendering.

use serde::{Deserialize, Serialize};

/// Raw viseme event as produced by the synthesis engine
///
/// Offsets are milliseconds from audio start and are non-decreasing
/// across a sequence. The duration is not trustworthy until processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisemeEvent {
    pub viseme_id: u32,
    pub offset: u64,
    pub duration: u64,
}

impl VisemeEvent {
    pub fn new(viseme_id: u32, offset: u64, duration: u64) -> Self {
        Self {
            viseme_id,
            offset,
            duration,
        }
    }
}

/// Viseme event after key-framing
///
/// Key frames anchor animation interpolation; non-key frames are short
/// transitional shapes a renderer may de-prioritize under load.
/// In-between events are synthetic silences inserted by gap filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedVisemeEvent {
    pub viseme_id: u32,
    pub offset: u64,
    pub duration: u64,
    pub is_key_frame: bool,
    pub is_in_between: bool,
}

impl ProcessedVisemeEvent {
    /// End of this event (ms from audio start)
    pub fn end(&self) -> u64 {
        self.offset + self.duration
    }
}

/// Word boundary reported by the synthesis engine
///
/// Collected alongside visemes; informational only for now (available
/// for prosody-aware timing later).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordBoundaryEvent {
    pub word: String,
    pub offset: u64,
    pub duration: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_event_end() {
        let event = ProcessedVisemeEvent {
            viseme_id: 3,
            offset: 100,
            duration: 200,
            is_key_frame: true,
            is_in_between: false,
        };
        assert_eq!(event.end(), 300);
    }

    #[test]
    fn test_wire_field_names() {
        let event = ProcessedVisemeEvent {
            viseme_id: 1,
            offset: 0,
            duration: 100,
            is_key_frame: false,
            is_in_between: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"visemeId\""));
        assert!(json.contains("\"isKeyFrame\""));
        assert!(json.contains("\"isInBetween\""));
    }
}
