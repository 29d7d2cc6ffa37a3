use super::state::AppState;
use crate::error::InterviewError;
use crate::session::SessionView;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// Target role the interviewer asks about
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub status: String,
    pub message: String,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn status_for(err: &InterviewError) -> StatusCode {
    match err {
        InterviewError::InvalidState { .. } => StatusCode::CONFLICT,
        InterviewError::DeviceAccessDenied(_) => StatusCode::FORBIDDEN,
        InterviewError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
        InterviewError::TransportError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &InterviewError) -> Response {
    (
        status_for(err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interview/connect
/// Start an interview session
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> impl IntoResponse {
    let role = req.role.trim().to_string();
    if role.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "role must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    info!("Connect requested for role: {}", role);

    if let Err(e) = state.session.connect(role.clone()).await {
        error!("Failed to connect: {}", e);
        return error_response(&e);
    }

    let session = state.session.view();
    (
        StatusCode::OK,
        Json(SessionResponse {
            status: session.state.label().to_string(),
            message: format!("Interview connecting for role {}", role),
            session,
        }),
    )
        .into_response()
}

/// POST /interview/disconnect
/// End the interview session (no-op when idle)
pub async fn disconnect(State(state): State<AppState>) -> impl IntoResponse {
    info!("Disconnect requested");

    state.session.disconnect().await;

    let session = state.session.view();
    (
        StatusCode::OK,
        Json(SessionResponse {
            status: session.state.label().to_string(),
            message: "Interview ended".to_string(),
            session,
        }),
    )
}

/// GET /interview/status
/// Current observable session state
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.session.view()))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
