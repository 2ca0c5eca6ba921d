//! HTTP endpoints
//!
//! REST API for the speaking tutor. Error mapping follows the dialogue
//! failure taxonomy: missing input is a 400, missing auth a 401, a
//! missing session a 404, and a failed generation a 500 with a generic
//! message; audio and lip-sync failures never surface here at all.

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use speaktutor_dialogue::{DialogueError, RespondRequest};

use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/speaking/respond", post(respond))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Speaking-turn endpoint
async fn respond(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RespondRequest>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    match state.orchestrator.respond(&request).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

/// API-key gate. Disabled by default for development; when enabled,
/// requests without the right key get a 401 before any work happens.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let auth = &state.config.server.auth;
    if !auth.enabled {
        return Ok(());
    }

    let presented = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match (&auth.api_key, presented) {
        (Some(expected), Some(given)) if given == expected => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Authentication required" })),
        )
            .into_response()),
    }
}

fn error_response(error: DialogueError) -> Response {
    let (status, message) = match &error {
        DialogueError::MissingField(field) => (
            StatusCode::BAD_REQUEST,
            format!("Missing required field: {field}"),
        ),
        DialogueError::SessionNotFound(_) => (
            StatusCode::NOT_FOUND,
            "Speaking session not found".to_string(),
        ),
        DialogueError::Generation => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate response".to_string(),
        ),
        DialogueError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    };

    if status.is_server_error() {
        tracing::error!(error = %error, "Respond request failed");
    }

    (
        status,
        Json(serde_json::json!({
            "error": message,
            "details": error.to_string(),
        })),
    )
        .into_response()
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
    }))
}
