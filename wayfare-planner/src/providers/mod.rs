//! External collaborators
//!
//! Each provider is a trait so the pipeline can run against real HTTP clients in
//! production and in-process fakes in tests. Client-specific error enums
//! collapse into [`ProviderError`] at the trait boundary.

pub mod google_maps;
pub mod openai;
pub mod scraper;
pub mod unsplash;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use wayfare_common::itinerary::{Coordinates, TravelLeg, TravelMode};

use crate::config::ProviderSettings;
use crate::models::FlightOffer;

pub use google_maps::{GoogleMapsClient, MapsError};
pub use openai::{LlmError, OpenAiClient};
pub use scraper::{ScraperClient, ScraperError};
pub use unsplash::{PhotoError, UnsplashClient};

/// User agent sent by every HTTP client
pub const USER_AGENT: &str = concat!("wayfare-planner/", env!("CARGO_PKG_VERSION"));

/// Failure of any external call
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} call timed out after {timeout_ms} ms")]
    Timeout {
        provider: &'static str,
        timeout_ms: u64,
    },

    #[error(transparent)]
    Photo(#[from] PhotoError),

    #[error(transparent)]
    Maps(#[from] MapsError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Scraper(#[from] ScraperError),
}

/// Representative photo search
#[async_trait]
pub trait PhotoProvider: Send + Sync {
    /// URL of the best matching photo, `None` when the search is empty
    async fn search_photo(&self, query: &str) -> Result<Option<String>, ProviderError>;
}

/// Free-text address to coordinates
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// `region` is a lower-case ISO-3166 code biasing ambiguous results
    async fn geocode(
        &self,
        address: &str,
        region: Option<&str>,
    ) -> Result<Option<Coordinates>, ProviderError>;
}

/// Travel time and distance between two points
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
    ) -> Result<Option<TravelLeg>, ProviderError>;
}

/// Large-language-model text completion
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Flight-offer scraping service
#[async_trait]
pub trait FlightScraper: Send + Sync {
    async fn scrape(&self, booking_url: &str) -> Result<Vec<FlightOffer>, ProviderError>;
}

/// The full set of collaborators used by the pipeline
#[derive(Clone)]
pub struct Providers {
    pub photos: Arc<dyn PhotoProvider>,
    pub geocoder: Arc<dyn GeocodingProvider>,
    pub router: Arc<dyn RoutingProvider>,
    pub generator: Arc<dyn TextGenerator>,
    pub scraper: Arc<dyn FlightScraper>,
}

impl Providers {
    /// Build the HTTP-backed providers
    ///
    /// Providers without an API key are still constructed; their calls fail
    /// fast with a `MissingApiKey` error.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let maps = Arc::new(GoogleMapsClient::new(
            settings.google_maps_api_key.clone(),
            settings.call_timeout,
        )?);

        Ok(Self {
            photos: Arc::new(UnsplashClient::new(
                settings.unsplash_access_key.clone(),
                settings.call_timeout,
            )?),
            geocoder: maps.clone(),
            router: maps,
            generator: Arc::new(OpenAiClient::new(
                settings.llm_api_key.clone(),
                settings.llm_base_url.clone(),
                settings.llm_model.clone(),
                settings.generation_timeout,
            )?),
            scraper: Arc::new(ScraperClient::new(
                settings.scraper_url.clone(),
                settings.generation_timeout,
            )?),
        })
    }
}

/// Run a provider call under a deadline, turning expiry into [`ProviderError::Timeout`]
pub async fn with_timeout<T, F>(
    provider: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            provider,
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

pub(crate) type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Token-bucket limiter allowing `per_second` requests per second
pub(crate) fn rate_limiter(per_second: u32) -> DirectRateLimiter {
    RateLimiter::direct(Quota::per_second(
        NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN),
    ))
}

/// Non-empty API key or `None`
pub(crate) fn usable_key(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}
