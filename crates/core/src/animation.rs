//! Facial animation track types
//!
//! Secondary animation tracks derived per response from speech duration
//! and text features. Never persisted; the data lives only as long as
//! the HTTP response that carries it.

use serde::{Deserialize, Serialize};

use crate::viseme::ProcessedVisemeEvent;

/// A slow gaze shift during longer speech
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EyeMovement {
    pub offset: u64,
    pub duration: u64,
    pub intensity: f32,
}

/// An eyebrow raise, used sparingly on questions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EyebrowExpression {
    pub offset: u64,
    pub duration: u64,
    pub intensity: f32,
}

/// Head gesture entry. The track is currently always empty but stays in
/// the payload so renderers keep a stable shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadGesture {
    pub offset: u64,
    pub duration: u64,
    pub intensity: f32,
}

/// A single blink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkPattern {
    pub offset: u64,
    pub duration: u64,
    pub intensity: f32,
}

/// Full per-response animation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacialAnimationData {
    pub visemes: Vec<ProcessedVisemeEvent>,
    pub eye_movements: Vec<EyeMovement>,
    pub eyebrow_expressions: Vec<EyebrowExpression>,
    pub head_gestures: Vec<HeadGesture>,
    pub blink_patterns: Vec<BlinkPattern>,
}

impl FacialAnimationData {
    /// Payload with every track empty (no lip sync available)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.visemes.is_empty()
            && self.eye_movements.is_empty()
            && self.eyebrow_expressions.is_empty()
            && self.head_gestures.is_empty()
            && self.blink_patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload() {
        let data = FacialAnimationData::empty();
        assert!(data.is_empty());

        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"eyeMovements\""));
        assert!(json.contains("\"headGestures\""));
        assert!(json.contains("\"blinkPatterns\""));
    }
}
