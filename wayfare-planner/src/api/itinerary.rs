//! Itinerary generation and enrichment handlers

use axum::{
    extract::{Path, Query, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfare_common::ItineraryDocument;

use crate::error::ApiResult;
use crate::services::DayEnrichment;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EnrichQuery {
    /// Zero-based day index; absent means the whole itinerary
    pub day: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EnrichResponse {
    Day(DayEnrichment),
    All { itinerary: ItineraryDocument },
}

/// POST /groups/:id/itinerary
///
/// Generates and stores a new unenriched itinerary. 502 when the generator
/// fails or returns no parsable document.
pub async fn generate_itinerary(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<ItineraryDocument>> {
    let document = state
        .track(state.orchestrator.generate_itinerary(group_id).await)
        .await?;
    Ok(Json(document))
}

/// POST /groups/:id/itinerary/enrich?day=N
pub async fn enrich_itinerary(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<EnrichQuery>,
) -> ApiResult<Json<EnrichResponse>> {
    let response = match query.day {
        Some(day_index) => EnrichResponse::Day(
            state
                .track(state.orchestrator.enrich_day(group_id, day_index).await)
                .await?,
        ),
        None => EnrichResponse::All {
            itinerary: state.track(state.orchestrator.enrich_all(group_id).await).await?,
        },
    };
    Ok(Json(response))
}

pub fn itinerary_routes() -> Router<AppState> {
    Router::new()
        .route("/groups/:id/itinerary", post(generate_itinerary))
        .route("/groups/:id/itinerary/enrich", post(enrich_itinerary))
}
