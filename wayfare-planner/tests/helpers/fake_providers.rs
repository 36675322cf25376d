//! In-process provider fakes with call recording and failure injection

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wayfare_common::itinerary::{Coordinates, TravelLeg, TravelMode};
use wayfare_planner::models::FlightOffer;
use wayfare_planner::providers::{
    FlightScraper, GeocodingProvider, LlmError, MapsError, PhotoError, PhotoProvider,
    ProviderError, Providers, RoutingProvider, ScraperError, TextGenerator,
};

pub const DEFAULT_IMAGE: &str = "https://images.test/default.jpg";

/// Every provider the pipeline uses, answering from memory
///
/// Photos are `https://photos.test/<query>`; coordinates derive from the
/// address bytes; every mode of every hop routes as "12 mins" / "3.4 km".
/// Generator output is taken from the queued responses first, then from
/// `default_response`.
#[derive(Default)]
pub struct FakeProviders {
    pub responses: Mutex<VecDeque<String>>,
    pub default_response: Mutex<String>,
    pub prompts: Mutex<Vec<String>>,
    pub generate_calls: AtomicUsize,
    pub generate_delay_ms: AtomicU64,
    pub fail_generation: AtomicBool,

    pub photo_calls: AtomicUsize,
    pub fail_photos: AtomicBool,
    pub geocode_calls: AtomicUsize,
    pub fail_geocoding: AtomicBool,
    pub route_calls: AtomicUsize,
    pub fail_routing: AtomicBool,

    pub offers: Mutex<Vec<FlightOffer>>,
    pub scraped_urls: Mutex<Vec<String>>,
    pub fail_scraping: AtomicBool,
}

impl FakeProviders {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        *fake.default_response.lock().unwrap() = itinerary_response("Leh", 2, 3);
        Arc::new(fake)
    }

    pub fn providers(self: &Arc<Self>) -> Providers {
        Providers {
            photos: self.clone(),
            geocoder: self.clone(),
            router: self.clone(),
            generator: self.clone(),
            scraper: self.clone(),
        }
    }

    pub fn queue_response(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push_back(response.into());
    }

    pub fn set_generate_delay(&self, delay: Duration) {
        self.generate_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn enrichment_calls(&self) -> usize {
        self.photo_calls.load(Ordering::SeqCst)
            + self.geocode_calls.load(Ordering::SeqCst)
            + self.route_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PhotoProvider for FakeProviders {
    async fn search_photo(&self, query: &str) -> Result<Option<String>, ProviderError> {
        self.photo_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_photos.load(Ordering::SeqCst) {
            return Err(PhotoError::NetworkError("connection reset".to_string()).into());
        }
        Ok(Some(format!("https://photos.test/{}", query.replace([' ', ','], "_"))))
    }
}

#[async_trait]
impl GeocodingProvider for FakeProviders {
    async fn geocode(&self, address: &str, _region: Option<&str>) -> Result<Option<Coordinates>, ProviderError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_geocoding.load(Ordering::SeqCst) {
            return Err(MapsError::Status {
                status: "OVER_QUERY_LIMIT".to_string(),
                message: "quota".to_string(),
            }
            .into());
        }
        let n = address.bytes().map(f64::from).sum::<f64>() % 1000.0;
        Ok(Some(Coordinates {
            lat: 34.0 + n / 1000.0,
            lng: 77.0 + n / 1000.0,
        }))
    }
}

#[async_trait]
impl RoutingProvider for FakeProviders {
    async fn route(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
        _mode: TravelMode,
    ) -> Result<Option<TravelLeg>, ProviderError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_routing.load(Ordering::SeqCst) {
            return Err(MapsError::NetworkError("timeout".to_string()).into());
        }
        Ok(Some(TravelLeg {
            duration: "12 mins".to_string(),
            distance: "3.4 km".to_string(),
        }))
    }
}

#[async_trait]
impl TextGenerator for FakeProviders {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let delay = self.generate_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_generation.load(Ordering::SeqCst) {
            return Err(LlmError::ApiError(503, "overloaded".to_string()).into());
        }

        let queued = self.responses.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| self.default_response.lock().unwrap().clone()))
    }
}

#[async_trait]
impl FlightScraper for FakeProviders {
    async fn scrape(&self, booking_url: &str) -> Result<Vec<FlightOffer>, ProviderError> {
        self.scraped_urls.lock().unwrap().push(booking_url.to_string());
        if self.fail_scraping.load(Ordering::SeqCst) {
            return Err(ScraperError::ApiError(500, "browser crashed".to_string()).into());
        }
        Ok(self.offers.lock().unwrap().clone())
    }
}

/// Generator output: prose around an itinerary JSON object
///
/// Places are named `"<tag> Place <day>-<n>"`. Hotels: A at $200, B at $150
/// and C with an unparseable price.
pub fn itinerary_response(tag: &str, days: usize, places_per_day: usize) -> String {
    let days_json: Vec<serde_json::Value> = (1..=days)
        .map(|d| {
            let places: Vec<serde_json::Value> = (1..=places_per_day)
                .map(|p| {
                    serde_json::json!({
                        "name": format!("{} Place {}-{}", tag, d, p),
                        "description": "A stop worth the climb",
                        "duration": "1 hour",
                        "type": "cultural",
                        "visitTime": format!("{:02}:00 AM", 8 + p),
                    })
                })
                .collect();
            serde_json::json!({
                "date": format!("{}", 25 + d),
                "day": "Saturday",
                "month": "July",
                "places": places,
            })
        })
        .collect();

    let document = serde_json::json!({
        "days": days_json,
        "hotels": [
            {"name": "Hotel A", "rating": 4.5, "price": "$200", "amenities": ["wifi"]},
            {"name": "Hotel B", "rating": "4.1", "price": "$150"},
            {"name": "Hotel C", "price": "price on request"}
        ],
        "flights": [],
        "budgetRange": "INR 40,000 - 60,000"
    });

    format!("Here is the plan you asked for:\n```json\n{}\n```\nHave a great trip!", document)
}
