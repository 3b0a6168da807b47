//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{MatchSettings, MatchSnapshot, MatchStatistics, SessionHandle, SettingsError};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::ClientMsg;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/:id",
            get(session_handler).delete(end_session_handler),
        )
        .route("/sessions/:id/stats", get(stats_handler))
        .route("/sessions/:id/commands", post(command_handler))
        .route("/sessions/:id/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
    })
}

// ============================================================================
// Session endpoints
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct CreateSessionRequest {
    settings: Option<MatchSettings>,
}

#[derive(Serialize)]
struct CreateSessionResponse {
    session_id: Uuid,
    ws_path: String,
    snapshot: MatchSnapshot,
}

async fn create_session_handler(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session = state.sessions.create(req.settings)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            ws_path: format!("/sessions/{}/ws", session.id),
            snapshot: session.snapshot(),
        }),
    ))
}

async fn session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    let session = find_session(&state, id)?;
    Ok(Json(session.snapshot()))
}

async fn stats_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStatistics>, AppError> {
    let session = find_session(&state, id)?;
    let snapshot = session.snapshot();
    Ok(Json(MatchStatistics::from_history(&snapshot.state.shot_history)))
}

async fn command_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(msg): Json<ClientMsg>,
) -> Result<StatusCode, AppError> {
    let session = find_session(&state, id)?;
    session
        .send(None, msg)
        .await
        .map_err(|e| AppError::Gone(e.to_string()))?;
    Ok(StatusCode::ACCEPTED)
}

async fn end_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    find_session(&state, id)?;
    state
        .sessions
        .close(&id)
        .await
        .map_err(|e| AppError::Gone(e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

fn find_session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gone: {0}")]
    Gone(String),
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Gone(msg) => (StatusCode::GONE, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
