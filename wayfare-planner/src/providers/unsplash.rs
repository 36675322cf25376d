//! Unsplash photo search client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::{rate_limiter, usable_key, DirectRateLimiter, PhotoProvider, ProviderError, USER_AGENT};

const UNSPLASH_BASE_URL: &str = "https://api.unsplash.com";

/// Unsplash demo applications get 50 requests/hour; stay well under burst limits
const REQUESTS_PER_SECOND: u32 = 5;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Unsplash access key not configured")]
    MissingApiKey,

    #[error("Unsplash network error: {0}")]
    NetworkError(String),

    #[error("Unsplash API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Unsplash parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
    small: Option<String>,
}

pub struct UnsplashClient {
    http_client: Client,
    base_url: String,
    access_key: Option<String>,
    rate_limiter: DirectRateLimiter,
}

impl UnsplashClient {
    pub fn new(access_key: Option<String>, timeout: Duration) -> Result<Self, PhotoError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PhotoError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: UNSPLASH_BASE_URL.to_string(),
            access_key: usable_key(access_key),
            rate_limiter: rate_limiter(REQUESTS_PER_SECOND),
        })
    }

    /// Point the client at another host (staging proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(&self, query: &str) -> Result<Option<String>, PhotoError> {
        let access_key = self.access_key.as_deref().ok_or(PhotoError::MissingApiKey)?;

        self.rate_limiter.until_ready().await;
        debug!(query, "Querying Unsplash");

        let response = self
            .http_client
            .get(format!("{}/search/photos", self.base_url))
            .query(&[("query", query), ("per_page", "1")])
            .header("Authorization", format!("Client-ID {}", access_key))
            .header("Accept-Version", "v1")
            .send()
            .await
            .map_err(|e| PhotoError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PhotoError::ApiError(status.as_u16(), body));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PhotoError::ParseError(e.to_string()))?;

        Ok(first_photo_url(body))
    }
}

fn first_photo_url(response: SearchResponse) -> Option<String> {
    response
        .results
        .into_iter()
        .next()
        .and_then(|r| r.urls.regular.or(r.urls.small))
}

#[async_trait]
impl PhotoProvider for UnsplashClient {
    async fn search_photo(&self, query: &str) -> Result<Option<String>, ProviderError> {
        Ok(self.search(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_photo_url_prefers_regular() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"total": 2, "results": [
                {"id": "a", "urls": {"regular": "https://images.unsplash.com/a?w=1080", "small": "https://images.unsplash.com/a?w=400"}},
                {"id": "b", "urls": {"regular": "https://images.unsplash.com/b"}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            first_photo_url(response).as_deref(),
            Some("https://images.unsplash.com/a?w=1080")
        );
    }

    #[test]
    fn test_empty_results_is_none() {
        let response: SearchResponse = serde_json::from_str(r#"{"total": 0, "results": []}"#).unwrap();
        assert!(first_photo_url(response).is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = UnsplashClient::new(None, Duration::from_secs(1)).unwrap();
        let err = client.search_photo("Leh Palace Leh").await.unwrap_err();
        assert!(matches!(err, ProviderError::Photo(PhotoError::MissingApiKey)));
    }
}
