use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{LeaderboardEntryResponse, LeaderboardQuery, SubmitScoreRequest},
    service,
};
use crate::{auth::jwt::Caller, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/leaderboard", get(list_leaderboard).post(submit_score))
}

#[instrument(skip(state))]
pub async fn list_leaderboard(
    State(state): State<AppState>,
    Query(q): Query<LeaderboardQuery>,
) -> AppResult<Json<Vec<LeaderboardEntryResponse>>> {
    let page = service::list(state.store.as_ref(), q.limit).await?;
    Ok(Json(page.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, body), fields(user_id = %caller.user_id))]
pub async fn submit_score(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<SubmitScoreRequest>,
) -> AppResult<(StatusCode, Json<LeaderboardEntryResponse>)> {
    let ranked = service::submit(
        state.store.as_ref(),
        caller,
        body.user_id,
        body.username,
        body.score,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ranked.into())))
}
