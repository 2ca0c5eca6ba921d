//! Facial animation composer
//!
//! Secondary motion is deliberately sparse: the goal is a mostly still
//! face with a synced mouth, not full facial animation. Each track gates
//! on total speech duration (or a text feature) and fires at most once
//! per response; short utterances get nothing at all.

use rand::Rng;
use speaktutor_core::{
    BlinkPattern, EyeMovement, EyebrowExpression, FacialAnimationData, ProcessedVisemeEvent,
};

/// Eye movement fires only when total speech exceeds this, ms
pub const EYE_MOVEMENT_MIN_TOTAL_MS: u64 = 20_000;
/// Scheduling window for the eye movement, ms
pub const EYE_MOVEMENT_EARLIEST_MS: u64 = 30_000;
pub const EYE_MOVEMENT_LATEST_MS: u64 = 40_000;
pub const EYE_MOVEMENT_DURATION_MS: u64 = 2_000;
pub const EYE_MOVEMENT_INTENSITY: f32 = 0.05;

/// Chance a question gets an eyebrow raise
pub const EYEBROW_RAISE_PROBABILITY: f64 = 0.15;
/// Eyebrow raise position as a fraction of total speech duration
pub const EYEBROW_RAISE_POSITION: f64 = 0.8;
pub const EYEBROW_RAISE_DURATION_MS: u64 = 1_500;
pub const EYEBROW_RAISE_INTENSITY: f32 = 0.08;

/// Blink fires only when total speech exceeds this, ms
pub const BLINK_MIN_TOTAL_MS: u64 = 15_000;
/// Scheduling window for the blink, ms
pub const BLINK_EARLIEST_MS: u64 = 25_000;
pub const BLINK_LATEST_MS: u64 = 35_000;
pub const BLINK_DURATION_MS: u64 = 300;
pub const BLINK_INTENSITY: f32 = 1.0;

/// Compose secondary animation tracks over a processed viseme sequence.
///
/// With no visemes there is no lip sync, and a face that blinks without
/// speaking reads as broken, so every derived track stays empty.
pub fn compose(text: &str, visemes: &[ProcessedVisemeEvent]) -> FacialAnimationData {
    compose_with_rng(text, visemes, &mut rand::thread_rng())
}

/// [`compose`] with injectable randomness for deterministic tests.
pub fn compose_with_rng<R: Rng + ?Sized>(
    text: &str,
    visemes: &[ProcessedVisemeEvent],
    rng: &mut R,
) -> FacialAnimationData {
    let Some(last) = visemes.last() else {
        return FacialAnimationData::empty();
    };
    let total = last.end();

    let mut data = FacialAnimationData {
        visemes: visemes.to_vec(),
        ..Default::default()
    };

    if total > EYE_MOVEMENT_MIN_TOTAL_MS {
        data.eye_movements.push(EyeMovement {
            offset: rng.gen_range(EYE_MOVEMENT_EARLIEST_MS..EYE_MOVEMENT_LATEST_MS),
            duration: EYE_MOVEMENT_DURATION_MS,
            intensity: EYE_MOVEMENT_INTENSITY,
        });
    }

    if text.contains('?') && rng.gen_bool(EYEBROW_RAISE_PROBABILITY) {
        data.eyebrow_expressions.push(EyebrowExpression {
            offset: (total as f64 * EYEBROW_RAISE_POSITION) as u64,
            duration: EYEBROW_RAISE_DURATION_MS,
            intensity: EYEBROW_RAISE_INTENSITY,
        });
    }

    // Head gestures stay empty: the track is reserved, not removed.

    if total > BLINK_MIN_TOTAL_MS {
        data.blink_patterns.push(BlinkPattern {
            offset: rng.gen_range(BLINK_EARLIEST_MS..BLINK_LATEST_MS),
            duration: BLINK_DURATION_MS,
            intensity: BLINK_INTENSITY,
        });
    }

    data
}
