//! Flight handlers
//!
//! The two pure endpoints (`/flights/parse`, `/booking-url`) need no group and
//! make no external calls.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{FlightOffer, ParsedFlight, TravelDates, TravelGroup};
use crate::services::{booking_url_for, parse_flight_options, FlightOptions};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BookingUrlResponse {
    pub booking_url: String,
}

/// POST /flights/parse
///
/// **Request:** `[{"index": 0, "text_content": "..."}]`, one parsed flight per offer
pub async fn parse_flights(Json(offers): Json<Vec<FlightOffer>>) -> Json<Vec<ParsedFlight>> {
    Json(parse_flight_options(&offers))
}

/// POST /booking-url
pub async fn booking_url(Json(dates): Json<TravelDates>) -> ApiResult<Json<BookingUrlResponse>> {
    let booking_url = booking_url_for(&dates).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(BookingUrlResponse { booking_url }))
}

/// GET /groups/:id/flights
///
/// `{"status": "not_ready", ...}` until travel dates are determined.
pub async fn fetch_flight_options(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<FlightOptions>> {
    let options = state
        .track(state.orchestrator.fetch_flight_options(group_id).await)
        .await?;
    Ok(Json(options))
}

/// PUT /groups/:id/flight
pub async fn select_flight(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(flight): Json<ParsedFlight>,
) -> ApiResult<Json<TravelGroup>> {
    let group = state
        .track(state.orchestrator.select_flight(group_id, flight).await)
        .await?;
    Ok(Json(group))
}

pub fn flight_routes() -> Router<AppState> {
    Router::new()
        .route("/flights/parse", post(parse_flights))
        .route("/booking-url", post(booking_url))
        .route("/groups/:id/flights", get(fetch_flight_options))
        .route("/groups/:id/flight", put(select_flight))
}
