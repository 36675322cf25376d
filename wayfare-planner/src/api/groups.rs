//! Group and membership handlers
//!
//! POST /groups, GET /groups/:id, member join/preferences/leave and
//! POST /groups/:id/dates

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{GroupMember, MemberPreferences, TravelDates, TravelGroup};
use crate::services::{CreateGroupRequest, JoinGroupRequest, LeaveOutcome};
use crate::AppState;

/// POST /groups
///
/// Creates the group with the requesting user as host member. 201 Created.
pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<TravelGroup>)> {
    let group = state.track(state.orchestrator.create_group(request).await).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<TravelGroup>> {
    let group = state.track(state.orchestrator.get_group(group_id).await).await?;
    Ok(Json(group))
}

/// GET /groups/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<GroupMember>>> {
    let members = state.track(state.orchestrator.list_members(group_id).await).await?;
    Ok(Json(members))
}

/// POST /groups/:id/members
///
/// Joining twice updates the preferences of the existing member.
pub async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<JoinGroupRequest>,
) -> ApiResult<Json<GroupMember>> {
    let member = state.track(state.orchestrator.join_group(group_id, request).await).await?;
    Ok(Json(member))
}

/// PUT /groups/:id/members/:user/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, String)>,
    Json(preferences): Json<MemberPreferences>,
) -> ApiResult<Json<GroupMember>> {
    let member = state
        .track(state.orchestrator.update_preferences(group_id, &user_id, preferences).await)
        .await?;
    Ok(Json(member))
}

/// DELETE /groups/:id/members/:user
pub async fn leave_group(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<LeaveOutcome>> {
    let outcome = state.track(state.orchestrator.leave_group(group_id, &user_id).await).await?;
    Ok(Json(outcome))
}

/// POST /groups/:id/dates
///
/// **Request:** `{"departure_date": "2025-07-26", "return_date": "2025-08-02",
/// "departure_iata": "MAA", "destination_iata": "IXZ", "adult_count": 2}`
pub async fn determine_travel_dates(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(dates): Json<TravelDates>,
) -> ApiResult<Json<TravelGroup>> {
    let group = state
        .track(state.orchestrator.determine_travel_dates(group_id, dates).await)
        .await?;
    Ok(Json(group))
}

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", post(create_group))
        .route("/groups/:id", get(get_group))
        .route("/groups/:id/members", get(list_members).post(join_group))
        .route("/groups/:id/members/:user/preferences", put(update_preferences))
        .route("/groups/:id/members/:user", delete(leave_group))
        .route("/groups/:id/dates", post(determine_travel_dates))
}
