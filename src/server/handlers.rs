//! HTTP handlers over the session registry

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::dto::{
    AdvanceRequest, ErrorResponse, HealthResponse, LegacyMessage, ResetRequest, ResetResponse,
    StartRequest, TurnResponse,
};
use crate::error::DealbotError;
use crate::negotiation::{SessionRegistry, SessionSnapshot, SessionStatus};
use crate::types::{RequestId, SessionId};

/// Session used by the single-conversation `/initialize` and `/chatbot` routes
pub const DEFAULT_SESSION: &str = "default";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

/// Failure surfaced to HTTP callers as a status and `{error}` body
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Core(DealbotError),
}

impl From<DealbotError> for ApiError {
    fn from(err: DealbotError) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Core(err) => {
                let status = match err {
                    DealbotError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                    DealbotError::Configuration(_) | DealbotError::InvalidConfig(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = %err, "request failed");
                }
                (status, err.to_string())
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn require_message(message: &str) -> ApiResult<()> {
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    Ok(())
}

fn require_session_id(raw: &str) -> ApiResult<SessionId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("session_id must not be empty".to_string()));
    }
    Ok(SessionId::from(trimmed))
}

/// POST /negotiate/start
pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> ApiResult<Json<TurnResponse>> {
    require_message(&req.message)?;
    let id = match req.session_id.as_deref() {
        Some(raw) => require_session_id(raw)?,
        None => SessionId::generate(),
    };

    let outcome = state.registry.start(id.clone(), &req.message).await;
    Ok(Json(TurnResponse::new(&id, outcome)))
}

/// POST /negotiate/advance
pub async fn advance(
    State(state): State<AppState>,
    Json(req): Json<AdvanceRequest>,
) -> ApiResult<Json<TurnResponse>> {
    require_message(&req.message)?;
    let id = require_session_id(&req.session_id)?;
    let request_id = req.request_id.as_deref().map(RequestId::from);

    let outcome = state
        .registry
        .advance(&id, &req.message, request_id.as_ref())
        .await?;
    Ok(Json(TurnResponse::new(&id, outcome)))
}

/// POST /negotiate/reset
pub async fn reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> ApiResult<Json<ResetResponse>> {
    let id = require_session_id(&req.session_id)?;
    state.registry.reset(&id).await?;

    Ok(Json(ResetResponse {
        session_id: id.0,
        status: SessionStatus::Open,
    }))
}

/// GET /negotiate/{session_id}
pub async fn snapshot(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    let id = require_session_id(&session_id)?;
    Ok(Json(state.registry.snapshot(&id).await?))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        sessions: state.registry.len().await,
    };
    (StatusCode::OK, Json(payload))
}

/// POST /initialize
pub async fn initialize(
    State(state): State<AppState>,
    Json(req): Json<LegacyMessage>,
) -> ApiResult<Json<TurnResponse>> {
    require_message(&req.message)?;
    let id = SessionId::from(DEFAULT_SESSION);

    let outcome = state.registry.start(id.clone(), &req.message).await;
    Ok(Json(TurnResponse::new(&id, outcome)))
}

/// POST /chatbot; starts the default session again once a deal or decline has closed it
pub async fn chatbot(
    State(state): State<AppState>,
    Json(req): Json<LegacyMessage>,
) -> ApiResult<Json<TurnResponse>> {
    require_message(&req.message)?;
    let id = SessionId::from(DEFAULT_SESSION);

    let outcome = match state.registry.advance(&id, &req.message, None).await {
        Ok(outcome) => outcome,
        Err(DealbotError::SessionNotFound(_)) => state.registry.start(id.clone(), &req.message).await,
        Err(err) => return Err(err.into()),
    };
    Ok(Json(TurnResponse::new(&id, outcome)))
}
