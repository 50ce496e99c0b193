//! HTTP route handlers.

use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use serde::{Deserialize, Serialize};

use lettings_assistant::LifecycleState;

use crate::error::ApiError;
use crate::state::AppState;

/// Response for GET /health.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub environment: String,
    /// Assistant lifecycle: "uninitialized", "initialized", "ready" or "closed".
    pub assistant: String,
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let assistant = match state.assistant.state().await {
        LifecycleState::Uninitialized => "uninitialized",
        LifecycleState::Initialized => "initialized",
        LifecycleState::Ready => "ready",
        LifecycleState::Closed => "closed",
    };

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        environment: state.config.general.environment.clone(),
        assistant: assistant.to_string(),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
