//! Viseme key-framing and facial animation composition
//!
//! Two pure transforms sit between the synthesis engine and the
//! renderer:
//! - [`process`] turns the engine's raw, irregular viseme events into a
//!   key-framed sequence with perceptible durations and filled silences.
//! - [`compose`] layers sparse secondary motion (eye movement, eyebrow,
//!   blink) over the processed visemes.
//!
//! Neither does I/O; the composer's only impurity is its scheduling
//! randomness, which is injectable for tests.

pub mod composer;
pub mod keyframe;

pub use composer::{compose, compose_with_rng};
pub use keyframe::process;
