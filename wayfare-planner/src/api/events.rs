//! Per-group SSE event stream

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;
use wayfare_common::sse::group_event_stream;

use crate::error::ApiResult;
use crate::AppState;

/// GET /groups/:id/events
///
/// Streams `GroupCreated`, `TravelDatesDetermined`, `ItineraryGenerated`,
/// `DayEnriched`, regenerate-vote and hotel-winner events of one group.
/// 404 for an unknown group.
pub async fn group_events(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.track(state.orchestrator.get_group(group_id).await).await?;
    Ok(group_event_stream(state.event_bus.subscribe(), group_id))
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/groups/:id/events", get(group_events))
}
