//! Voting handlers: regenerate, hotel and per-place votes

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{GroupMember, PlaceVote};
use crate::services::{HotelVoteOutcome, PlaceVoteSummary, RegenerateVoteOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegenerateVoteRequest {
    pub user_id: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HotelSelectionRequest {
    /// `null` clears the selection
    pub hotel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceVoteRequest {
    pub vote: PlaceVote,
}

/// POST /groups/:id/votes/regenerate
///
/// **Response:** `{"triggered": bool, "votes": n, "total": n, "threshold": n, "status": ...}`
///
/// The vote that crosses the majority runs the regeneration before responding.
pub async fn cast_regenerate_vote(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<RegenerateVoteRequest>,
) -> ApiResult<Json<RegenerateVoteOutcome>> {
    let outcome = state
        .track(
            state
                .orchestrator
                .cast_regenerate_vote(group_id, &request.user_id, request.feedback)
                .await,
        )
        .await?;
    Ok(Json(outcome))
}

/// PUT /groups/:id/members/:user/hotel
pub async fn select_hotel(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, String)>,
    Json(request): Json<HotelSelectionRequest>,
) -> ApiResult<Json<GroupMember>> {
    let member = state
        .track(state.orchestrator.select_hotel(group_id, &user_id, request.hotel_id).await)
        .await?;
    Ok(Json(member))
}

/// POST /groups/:id/votes/hotel
///
/// **Response:** `{"winner_hotel_id": ..., "rule": "plurality|lowest_price|list_order", "tallies": [...]}`
pub async fn aggregate_hotel_vote(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<HotelVoteOutcome>> {
    let outcome = state
        .track(state.orchestrator.aggregate_hotel_vote(group_id).await)
        .await?;
    Ok(Json(outcome))
}

/// PUT /groups/:id/members/:user/places/:place
pub async fn record_place_vote(
    State(state): State<AppState>,
    Path((group_id, user_id, place_id)): Path<(Uuid, String, String)>,
    Json(request): Json<PlaceVoteRequest>,
) -> ApiResult<Json<GroupMember>> {
    let member = state
        .track(
            state
                .orchestrator
                .record_place_vote(group_id, &user_id, &place_id, request.vote)
                .await,
        )
        .await?;
    Ok(Json(member))
}

/// GET /groups/:id/votes/places
pub async fn place_vote_summary(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PlaceVoteSummary>>> {
    let summary = state
        .track(state.orchestrator.place_vote_summary(group_id).await)
        .await?;
    Ok(Json(summary))
}

pub fn vote_routes() -> Router<AppState> {
    Router::new()
        .route("/groups/:id/votes/regenerate", post(cast_regenerate_vote))
        .route("/groups/:id/votes/hotel", post(aggregate_hotel_vote))
        .route("/groups/:id/votes/places", get(place_vote_summary))
        .route("/groups/:id/members/:user/hotel", put(select_hotel))
        .route("/groups/:id/members/:user/places/:place", put(record_place_vote))
}
