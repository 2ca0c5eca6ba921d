//! Core types for the speaking tutor
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation transcript turns
//! - Viseme and word-boundary events
//! - Facial animation tracks

pub mod animation;
pub mod turn;
pub mod viseme;

pub use animation::{
    BlinkPattern, EyeMovement, EyebrowExpression, FacialAnimationData, HeadGesture,
};
pub use turn::{ConversationTurn, TurnRole};
pub use viseme::{ProcessedVisemeEvent, VisemeEvent, WordBoundaryEvent};
