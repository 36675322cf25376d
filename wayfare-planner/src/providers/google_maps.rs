//! Google Maps Platform client (Geocoding + Directions)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use wayfare_common::itinerary::{Coordinates, TravelLeg, TravelMode};

use super::{
    rate_limiter, usable_key, DirectRateLimiter, GeocodingProvider, ProviderError, RoutingProvider,
    USER_AGENT,
};

const GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Shared by geocoding and directions; Google allows 50 QPS per project
const REQUESTS_PER_SECOND: u32 = 20;

#[derive(Debug, Error)]
pub enum MapsError {
    #[error("Google Maps API key not configured")]
    MissingApiKey,

    #[error("Google Maps network error: {0}")]
    NetworkError(String),

    #[error("Google Maps API error {0}: {1}")]
    ApiError(u16, String),

    /// Non-OK `status` field in an otherwise successful response
    #[error("Google Maps returned status {status}: {message}")]
    Status { status: String, message: String },

    #[error("Google Maps parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    duration: TextValue,
    distance: TextValue,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

pub struct GoogleMapsClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: DirectRateLimiter,
}

impl GoogleMapsClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, MapsError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| MapsError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: GOOGLE_MAPS_BASE_URL.to_string(),
            api_key: usable_key(api_key),
            rate_limiter: rate_limiter(REQUESTS_PER_SECOND),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MapsError> {
        let api_key = self.api_key.as_deref().ok_or(MapsError::MissingApiKey)?;

        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(format!("{}/{}/json", self.base_url, endpoint))
            .query(params)
            .query(&[("key", api_key)])
            .send()
            .await
            .map_err(|e| MapsError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MapsError::ApiError(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| MapsError::ParseError(e.to_string()))
    }

    async fn lookup_coordinates(
        &self,
        address: &str,
        region: Option<&str>,
    ) -> Result<Option<Coordinates>, MapsError> {
        debug!(address, region, "Geocoding");

        let mut params = vec![("address", address)];
        if let Some(region) = region {
            params.push(("region", region));
        }

        let response: GeocodeResponse = self.get_json("geocode", &params).await?;
        geocode_coordinates(response)
    }

    async fn lookup_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
    ) -> Result<Option<TravelLeg>, MapsError> {
        let origin = format!("{},{}", origin.lat, origin.lng);
        let destination = format!("{},{}", destination.lat, destination.lng);
        debug!(%origin, %destination, mode = mode.as_str(), "Requesting directions");

        let response: DirectionsResponse = self
            .get_json(
                "directions",
                &[
                    ("origin", origin.as_str()),
                    ("destination", destination.as_str()),
                    ("mode", mode.as_str()),
                ],
            )
            .await?;
        directions_leg(response)
    }
}

fn geocode_coordinates(response: GeocodeResponse) -> Result<Option<Coordinates>, MapsError> {
    match response.status.as_str() {
        "OK" => Ok(response.results.into_iter().next().map(|r| Coordinates {
            lat: r.geometry.location.lat,
            lng: r.geometry.location.lng,
        })),
        "ZERO_RESULTS" => Ok(None),
        _ => Err(MapsError::Status {
            message: response.error_message.unwrap_or_default(),
            status: response.status,
        }),
    }
}

fn directions_leg(response: DirectionsResponse) -> Result<Option<TravelLeg>, MapsError> {
    match response.status.as_str() {
        "OK" => Ok(response
            .routes
            .into_iter()
            .next()
            .and_then(|route| route.legs.into_iter().next())
            .map(|leg| TravelLeg {
                duration: leg.duration.text,
                distance: leg.distance.text,
            })),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(None),
        _ => Err(MapsError::Status {
            message: response.error_message.unwrap_or_default(),
            status: response.status,
        }),
    }
}

#[async_trait]
impl GeocodingProvider for GoogleMapsClient {
    async fn geocode(
        &self,
        address: &str,
        region: Option<&str>,
    ) -> Result<Option<Coordinates>, ProviderError> {
        Ok(self.lookup_coordinates(address, region).await?)
    }
}

#[async_trait]
impl RoutingProvider for GoogleMapsClient {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
    ) -> Result<Option<TravelLeg>, ProviderError> {
        Ok(self.lookup_route(origin, destination, mode).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geocode_ok_takes_first_result() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{"status": "OK", "results": [
                {"formatted_address": "Leh", "geometry": {"location": {"lat": 34.1526, "lng": 77.5771}}},
                {"formatted_address": "Other", "geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
            ]}"#,
        )
        .unwrap();

        let coords = geocode_coordinates(response).unwrap().unwrap();
        assert_eq!(coords, Coordinates { lat: 34.1526, lng: 77.5771 });
    }

    #[test]
    fn test_geocode_zero_results_is_none() {
        let response: GeocodeResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert!(geocode_coordinates(response).unwrap().is_none());
    }

    #[test]
    fn test_geocode_denied_is_error() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#,
        )
        .unwrap();
        assert!(matches!(
            geocode_coordinates(response),
            Err(MapsError::Status { ref status, .. }) if status == "REQUEST_DENIED"
        ));
    }

    #[test]
    fn test_directions_first_leg() {
        let response: DirectionsResponse = serde_json::from_str(
            r#"{"status": "OK", "routes": [{"legs": [
                {"duration": {"text": "12 mins", "value": 720}, "distance": {"text": "1.1 km", "value": 1100}}
            ]}]}"#,
        )
        .unwrap();

        let leg = directions_leg(response).unwrap().unwrap();
        assert_eq!(leg.duration, "12 mins");
        assert_eq!(leg.distance, "1.1 km");
    }

    #[test]
    fn test_directions_zero_results_is_none() {
        let response: DirectionsResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "routes": []}"#).unwrap();
        assert!(directions_leg(response).unwrap().is_none());
    }
}
