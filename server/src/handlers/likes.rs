use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::models::{EventId, LikeOutcome, LikeState, UserId};
use crate::state::AppState;
use crate::utils::response::success;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub event_id: EventId,
}

fn like_response(outcome: LikeOutcome) -> Response {
    let message = match outcome.state {
        LikeState::Liked => "Like added",
        LikeState::NotLiked => "Like removed",
    };
    success(outcome, message)
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(body): Json<ToggleLikeRequest>,
) -> AppResult<Response> {
    let outcome = state.events.toggle_like(user_id, body.event_id).await?;
    Ok(like_response(outcome))
}

pub async fn like_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
) -> AppResult<Response> {
    let outcome = state
        .events
        .set_like(user_id, event_id, LikeState::Liked)
        .await?;
    Ok(like_response(outcome))
}

pub async fn unlike_event(
    State(state): State<AppState>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
) -> AppResult<Response> {
    let outcome = state
        .events
        .set_like(user_id, event_id, LikeState::NotLiked)
        .await?;
    Ok(like_response(outcome))
}
