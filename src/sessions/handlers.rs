use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateSessionRequest, EndSessionRequest, MessageResponse, UpdateSessionRequest},
    model::GameSession,
    service,
};
use crate::{
    auth::jwt::Caller,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_active_sessions))
        .route("/sessions/:id", get(get_session))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", axum::routing::patch(update_session))
        .route("/sessions/:id/end", post(end_session))
}

#[instrument(skip(state))]
pub async fn list_active_sessions(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<GameSession>>> {
    let sessions = service::list_active(state.store.as_ref()).await?;
    Ok(Json(sessions))
}

#[instrument(skip(state, body), fields(user_id = %caller.user_id))]
pub async fn create_session(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<GameSession>)> {
    let session =
        service::create(state.store.as_ref(), caller, body.user_id, body.username).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/sessions/{}", session.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(session)))
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<GameSession>> {
    let session = service::get(state.store.as_ref(), parse_id(&id)?).await?;
    Ok(Json(session))
}

#[instrument(skip(state, body), fields(user_id = %caller.user_id))]
pub async fn update_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<UpdateSessionRequest>,
) -> AppResult<Json<GameSession>> {
    let session = service::update(state.store.as_ref(), caller, parse_id(&id)?, body.into()).await?;
    Ok(Json(session))
}

#[instrument(skip(state, body), fields(user_id = %caller.user_id))]
pub async fn end_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<EndSessionRequest>,
) -> AppResult<Json<MessageResponse>> {
    service::end(state.store.as_ref(), caller, parse_id(&id)?, body.final_score).await?;
    Ok(Json(MessageResponse {
        message: "Session ended",
    }))
}

/// Ids that are not UUIDs cannot name a stored session.
fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Session"))
}
