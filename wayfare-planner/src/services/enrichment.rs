//! Itinerary enrichment
//!
//! Fills photos, coordinates and travel modes on an [`ItineraryDocument`]
//! through the photo, geocoding and routing providers.
//!
//! Every provider call is isolated: a failure, an empty result or a timeout
//! degrades that one field (default image, no coordinates, missing mode) and
//! the run continues. Lookups for different places run concurrently; the hop
//! into place `i` is routed only after places `i - 1` and `i` have both been
//! geocoded. Enrichment only fills fields on existing entries, so list order and
//! length never change and re-running a day is idempotent.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use wayfare_common::itinerary::{Coordinates, Day, Place, TravelModes, TravelMode};
use wayfare_common::ItineraryDocument;

use crate::error::{PipelineError, PipelineResult};
use crate::providers::{with_timeout, ProviderError, Providers};
use crate::services::iata::region_for_destination;

/// Places or hotels looked up at the same time
const LOOKUP_CONCURRENCY: usize = 8;

/// Counts describing one enrichment run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    pub photos_fetched: usize,
    pub photos_defaulted: usize,
    /// Lookup failed but an earlier provider image was kept
    pub photos_retained: usize,
    pub coordinates_resolved: usize,
    pub coordinates_missing: usize,
    pub hops_routed: usize,
    /// Hops without coordinates on both ends
    pub hops_skipped: usize,
}

impl EnrichmentReport {
    fn absorb(&mut self, other: EnrichmentReport) {
        self.photos_fetched += other.photos_fetched;
        self.photos_defaulted += other.photos_defaulted;
        self.photos_retained += other.photos_retained;
        self.coordinates_resolved += other.coordinates_resolved;
        self.coordinates_missing += other.coordinates_missing;
        self.hops_routed += other.hops_routed;
        self.hops_skipped += other.hops_skipped;
    }
}

/// Result of one place lookup, applied to the document afterwards
struct PlaceLookup {
    image_url: Option<String>,
    coordinates: Option<Coordinates>,
}

#[derive(Clone)]
pub struct EnrichmentPipeline {
    providers: Providers,
    call_timeout: Duration,
    default_image_url: String,
}

impl EnrichmentPipeline {
    pub fn new(providers: Providers, call_timeout: Duration, default_image_url: impl Into<String>) -> Self {
        Self {
            providers,
            call_timeout,
            default_image_url: default_image_url.into(),
        }
    }

    pub fn default_image_url(&self) -> &str {
        &self.default_image_url
    }

    /// Enrich the places of one day
    ///
    /// An out-of-range `day_index` is rejected before any provider call.
    pub async fn enrich_day(
        &self,
        document: &mut ItineraryDocument,
        day_index: usize,
        destination: &str,
    ) -> PipelineResult<EnrichmentReport> {
        let day_count = document.days.len();
        let day = document.days.get_mut(day_index).ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "day index {} out of range (itinerary has {} days)",
                day_index, day_count
            ))
        })?;

        let report = self.enrich_places(day, destination).await;
        document.recompute_map_locations();

        info!(
            destination,
            day_index,
            photos_fetched = report.photos_fetched,
            photos_defaulted = report.photos_defaulted,
            coordinates_missing = report.coordinates_missing,
            hops_routed = report.hops_routed,
            hops_skipped = report.hops_skipped,
            "Day enrichment complete"
        );
        Ok(report)
    }

    /// Enrich every day, then every hotel
    pub async fn enrich_all(&self, document: &mut ItineraryDocument, destination: &str) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();

        for day in document.days.iter_mut() {
            report.absorb(self.enrich_places(day, destination).await);
        }
        report.absorb(self.enrich_hotels(document, destination).await);
        document.recompute_map_locations();

        info!(
            destination,
            days = document.days.len(),
            hotels = document.hotels.len(),
            photos_fetched = report.photos_fetched,
            photos_defaulted = report.photos_defaulted,
            coordinates_missing = report.coordinates_missing,
            hops_routed = report.hops_routed,
            "Itinerary enrichment complete"
        );
        report
    }

    /// Fetch a photo for every hotel
    pub async fn enrich_hotels(&self, document: &mut ItineraryDocument, destination: &str) -> EnrichmentReport {
        let queries: Vec<String> = document
            .hotels
            .iter()
            .map(|hotel| format!("{} hotel {}", hotel.name, destination))
            .collect();

        let lookups: Vec<_> = queries.iter().map(|query| self.fetch_photo(query)).collect();
        let images: Vec<Option<String>> = stream::iter(lookups)
            .buffered(LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut report = EnrichmentReport::default();
        for (hotel, image) in document.hotels.iter_mut().zip(images) {
            self.apply_image(&mut hotel.image_url, image, &mut report);
        }
        report
    }

    async fn enrich_places(&self, day: &mut Day, destination: &str) -> EnrichmentReport {
        let region = region_for_destination(destination);
        let mut report = EnrichmentReport::default();

        let pending: Vec<_> = day
            .places
            .iter()
            .map(|place| self.lookup_place(&place.name, destination, region))
            .collect();
        let lookups: Vec<PlaceLookup> = stream::iter(pending)
            .buffered(LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut moved = Vec::with_capacity(day.places.len());
        for (place, lookup) in day.places.iter_mut().zip(lookups) {
            self.apply_image(&mut place.image_url, lookup.image_url, &mut report);
            moved.push(lookup.coordinates.is_some() && lookup.coordinates != place.coordinates);
            if lookup.coordinates.is_some() {
                place.coordinates = lookup.coordinates;
            }
            if place.coordinates.is_some() {
                report.coordinates_resolved += 1;
            } else {
                report.coordinates_missing += 1;
            }
        }

        self.route_hops(&mut day.places, &moved, &mut report).await;
        report
    }

    async fn lookup_place(&self, name: &str, destination: &str, region: &str) -> PlaceLookup {
        let photo_query = format!("{} {}", name, destination);
        let (image_url, coordinates) = tokio::join!(
            self.fetch_photo(&photo_query),
            self.geocode_place(name, destination, region)
        );
        PlaceLookup { image_url, coordinates }
    }

    /// Route every hop of the day; the first place never carries travel modes
    ///
    /// `moved[i]` marks places whose coordinates changed in this run. A hop
    /// touching a moved place replaces its modes instead of merging into them.
    async fn route_hops(&self, places: &mut [Place], moved: &[bool], report: &mut EnrichmentReport) {
        if let Some(first) = places.first_mut() {
            first.travel_modes = None;
        }

        let hops: Vec<Option<(Coordinates, Coordinates)>> = places
            .windows(2)
            .map(|pair| match (pair[0].coordinates, pair[1].coordinates) {
                (Some(from), Some(to)) => Some((from, to)),
                _ => None,
            })
            .collect();

        let routed = join_all(hops.iter().map(|hop| async move {
            match hop {
                Some((from, to)) => Some(self.route_hop(*from, *to).await),
                None => None,
            }
        }))
        .await;

        for (i, (place, modes)) in places.iter_mut().skip(1).zip(routed).enumerate() {
            match modes {
                Some(modes) => {
                    report.hops_routed += 1;
                    let endpoint_moved = |k: usize| moved.get(k).copied().unwrap_or(false);
                    if endpoint_moved(i) || endpoint_moved(i + 1) {
                        place.travel_modes = None;
                    }
                    place.merge_travel_modes(modes);
                }
                None => {
                    report.hops_skipped += 1;
                    debug!(place = %place.name, "Skipping hop without coordinates");
                }
            }
        }
    }

    /// Query all four modes; modes that fail are left out
    async fn route_hop(&self, from: Coordinates, to: Coordinates) -> TravelModes {
        let results = join_all(TravelMode::ALL.iter().map(|mode| async move {
            let result = with_timeout("routing", self.call_timeout, self.providers.router.route(from, to, *mode)).await;
            (*mode, result)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(mode, result)| match result {
                Ok(Some(leg)) => Some((mode, leg)),
                Ok(None) => None,
                Err(e) => {
                    warn!(mode = mode.as_str(), error = %e, "Routing failed");
                    None
                }
            })
            .collect()
    }

    async fn fetch_photo(&self, query: &str) -> Option<String> {
        match with_timeout("photo", self.call_timeout, self.providers.photos.search_photo(query)).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                debug!(query, "No photo found");
                None
            }
            Err(e) => {
                warn_provider_failure("Photo lookup failed", query, &e);
                None
            }
        }
    }

    /// `"<name>, <destination>"`, falling back to the bare name
    async fn geocode_place(&self, name: &str, destination: &str, region: &str) -> Option<Coordinates> {
        let qualified = format!("{}, {}", name, destination);
        if let Some(coordinates) = self.geocode(&qualified, region).await {
            return Some(coordinates);
        }
        self.geocode(name, region).await
    }

    async fn geocode(&self, address: &str, region: &str) -> Option<Coordinates> {
        match with_timeout(
            "geocoding",
            self.call_timeout,
            self.providers.geocoder.geocode(address, Some(region)),
        )
        .await
        {
            Ok(coordinates) => coordinates,
            Err(e) => {
                warn_provider_failure("Geocoding failed", address, &e);
                None
            }
        }
    }

    /// Store a fetched image, or fall back without erasing an earlier provider image
    fn apply_image(&self, slot: &mut Option<String>, fetched: Option<String>, report: &mut EnrichmentReport) {
        match fetched {
            Some(url) => {
                *slot = Some(url);
                report.photos_fetched += 1;
            }
            None => match slot.as_deref() {
                Some(existing) if existing != self.default_image_url && !existing.trim().is_empty() => {
                    report.photos_retained += 1;
                }
                _ => {
                    *slot = Some(self.default_image_url.clone());
                    report.photos_defaulted += 1;
                }
            },
        }
    }
}

fn warn_provider_failure(message: &str, query: &str, error: &ProviderError) {
    warn!(query, error = %error, "{}", message);
}
