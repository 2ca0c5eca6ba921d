//! Viseme key-framing transform
//!
//! Raw viseme events arrive at irregular, often sub-frame-rate intervals.
//! Animating every event as-is produces jittery, unnaturally fast mouth
//! movement. The transform runs three passes over the sequence:
//!
//! 1. Duration inference: each event's duration becomes the clamped
//!    distance to its successor.
//! 2. Key-frame classification: events with enough room to be perceived
//!    become key frames with re-clamped durations; the rest are kept as
//!    short fixed-length transitional shapes. The final event is always
//!    a key frame. This pass overwrites pass 1 where the two disagree;
//!    both run.
//! 3. Gap filling: silences longer than the fill threshold get a
//!    synthetic neutral in-between event spanning exactly the gap.
//!
//! The thresholds below are hand-tuned policy constants, not values
//! derived from a perceptual model. Changing any of them changes the
//! animation feel; the apparent redundancy between the two clamping
//! passes is intentional.

use speaktutor_core::{ProcessedVisemeEvent, VisemeEvent};

/// Neutral/silence viseme id used for inserted in-between events
pub const SILENCE_VISEME_ID: u32 = 0;

/// Duration clamp for inferred durations (pass 1), ms
pub const INFERRED_MIN_MS: u64 = 120;
pub const INFERRED_MAX_MS: u64 = 500;

/// Floor for the final event's inferred duration (pass 1), ms
pub const LAST_INFERRED_MIN_MS: u64 = 150;

/// Gap at or above which an event is classified a key frame, ms
pub const KEY_FRAME_GAP_MS: u64 = 80;

/// Duration clamp for key frames (pass 2), ms
pub const KEY_FRAME_MIN_MS: u64 = 150;
pub const KEY_FRAME_MAX_MS: u64 = 600;

/// Fixed duration for transitional (non-key) visemes, ms
pub const TRANSITIONAL_MS: u64 = 100;

/// Floor for the final event's duration (pass 2), ms
pub const LAST_KEY_FRAME_MIN_MS: u64 = 200;

/// Fallback when the final event arrives with no duration at all, ms
pub const LAST_FALLBACK_MS: u64 = 300;

/// Silences longer than this get a neutral fill event, ms
pub const FILL_GAP_MS: u64 = 150;

/// Key-frame a raw viseme sequence.
///
/// Deterministic; empty input yields empty output, never a panic. A
/// single-event input is handled entirely by the final-event branches.
pub fn process(raw: &[VisemeEvent]) -> Vec<ProcessedVisemeEvent> {
    if raw.is_empty() {
        return Vec::new();
    }

    // Pass 1: infer durations from inter-event spacing.
    let mut inferred: Vec<VisemeEvent> = Vec::with_capacity(raw.len());
    for (i, event) in raw.iter().enumerate() {
        let duration = match raw.get(i + 1) {
            Some(next) => next
                .offset
                .saturating_sub(event.offset)
                .clamp(INFERRED_MIN_MS, INFERRED_MAX_MS),
            None => event.duration.max(LAST_INFERRED_MIN_MS),
        };
        inferred.push(VisemeEvent { duration, ..*event });
    }

    // Pass 2: classify and re-clamp against the recomputed gap.
    let mut classified: Vec<ProcessedVisemeEvent> = Vec::with_capacity(inferred.len());
    for (i, event) in inferred.iter().enumerate() {
        let processed = match inferred.get(i + 1) {
            Some(next) => {
                let gap = next.offset.saturating_sub(event.offset);
                if gap >= KEY_FRAME_GAP_MS {
                    ProcessedVisemeEvent {
                        viseme_id: event.viseme_id,
                        offset: event.offset,
                        duration: gap.clamp(KEY_FRAME_MIN_MS, KEY_FRAME_MAX_MS),
                        is_key_frame: true,
                        is_in_between: false,
                    }
                } else {
                    ProcessedVisemeEvent {
                        viseme_id: event.viseme_id,
                        offset: event.offset,
                        duration: TRANSITIONAL_MS,
                        is_key_frame: false,
                        is_in_between: false,
                    }
                }
            }
            None => {
                let duration = if event.duration == 0 {
                    LAST_FALLBACK_MS
                } else {
                    event.duration
                };
                ProcessedVisemeEvent {
                    viseme_id: event.viseme_id,
                    offset: event.offset,
                    duration: duration.max(LAST_KEY_FRAME_MIN_MS),
                    is_key_frame: true,
                    is_in_between: false,
                }
            }
        };
        classified.push(processed);
    }

    // Pass 3: fill silences with a neutral in-between event.
    let mut filled: Vec<ProcessedVisemeEvent> = Vec::with_capacity(classified.len());
    for (i, event) in classified.iter().enumerate() {
        filled.push(*event);
        if let Some(next) = classified.get(i + 1) {
            let gap = next.offset.saturating_sub(event.end());
            if gap > FILL_GAP_MS {
                filled.push(ProcessedVisemeEvent {
                    viseme_id: SILENCE_VISEME_ID,
                    offset: event.end(),
                    duration: gap,
                    is_key_frame: false,
                    is_in_between: true,
                });
            }
        }
    }

    filled
}
