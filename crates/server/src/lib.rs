//! Speaking tutor server
//!
//! HTTP surface over the dialogue orchestrator: one speaking-turn
//! endpoint plus health checks, with an optional API-key gate.

pub mod http;
pub mod state;

pub use http::create_router;
pub use state::AppState;
