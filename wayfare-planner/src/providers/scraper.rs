//! Flight-offer scraping service client
//!
//! The scraper renders the booking search page and returns the text of each
//! result card: `POST {base}/scrape {"url": ...}` → `[{index, text_content}]`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::{rate_limiter, DirectRateLimiter, FlightScraper, ProviderError, USER_AGENT};
use crate::models::FlightOffer;

pub const DEFAULT_SCRAPER_URL: &str = "http://127.0.0.1:8000";

const REQUESTS_PER_SECOND: u32 = 1;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Scraper network error: {0}")]
    NetworkError(String),

    #[error("Scraper error {0}: {1}")]
    ApiError(u16, String),

    #[error("Scraper parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
}

pub struct ScraperClient {
    http_client: Client,
    base_url: String,
    rate_limiter: DirectRateLimiter,
}

impl ScraperClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ScraperError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ScraperError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: rate_limiter(REQUESTS_PER_SECOND),
        })
    }

    async fn fetch_offers(&self, booking_url: &str) -> Result<Vec<FlightOffer>, ScraperError> {
        self.rate_limiter.until_ready().await;
        debug!(booking_url, "Requesting flight offers from scraper");

        let response = self
            .http_client
            .post(format!("{}/scrape", self.base_url))
            .json(&ScrapeRequest { url: booking_url })
            .send()
            .await
            .map_err(|e| ScraperError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScraperError::ApiError(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| ScraperError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl FlightScraper for ScraperClient {
    async fn scrape(&self, booking_url: &str) -> Result<Vec<FlightOffer>, ProviderError> {
        Ok(self.fetch_offers(booking_url).await?)
    }
}
