use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest},
        jwt::{AuthUser, JwtKeys},
        service,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = service::signup(
        state.store.as_ref(),
        &keys,
        &payload.username,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) =
        service::login(state.store.as_ref(), &keys, &payload.email, &payload.password).await?;
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

/// Tokens are stateless; the client discards its copy.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn logout(AuthUser(user_id): AuthUser) -> Json<Value> {
    Json(json!({ "message": "Successfully logged out" }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = service::current_user(state.store.as_ref(), user_id).await?;
    Ok(Json(user.into()))
}
