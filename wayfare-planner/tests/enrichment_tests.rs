//! Enrichment pipeline tests against fake providers

mod helpers;

use std::sync::atomic::Ordering;
use std::time::Duration;
use wayfare_common::itinerary::{Day, Place};
use wayfare_common::ItineraryDocument;
use wayfare_planner::services::{parse_itinerary_response, EnrichmentPipeline};

use helpers::{itinerary_response, FakeProviders, DEFAULT_IMAGE};

const DESTINATION: &str = "Leh, Ladakh, India";

fn pipeline(fake: &std::sync::Arc<FakeProviders>) -> EnrichmentPipeline {
    EnrichmentPipeline::new(fake.providers(), Duration::from_millis(500), DEFAULT_IMAGE)
}

fn long_day(places: usize) -> ItineraryDocument {
    let mut document = ItineraryDocument {
        days: vec![Day {
            places: (0..places)
                .map(|i| Place {
                    name: format!("Stop {:02}", i),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }],
        ..Default::default()
    };
    document.normalize();
    document
}

#[tokio::test]
async fn test_order_preserved_beyond_concurrency_limit() {
    let fake = FakeProviders::new();
    let mut document = long_day(20);
    let ids: Vec<String> = document.days[0].places.iter().map(|p| p.id.clone()).collect();

    let report = pipeline(&fake).enrich_day(&mut document, 0, DESTINATION).await.unwrap();

    let places = &document.days[0].places;
    assert_eq!(places.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), ids);
    for (i, place) in places.iter().enumerate() {
        let expected = format!("https://photos.test/Stop_{:02}_Leh__Ladakh__India", i);
        assert_eq!(place.image_url.as_deref(), Some(expected.as_str()));
    }
    assert_eq!(report.hops_routed, 19);
    assert_eq!(fake.route_calls.load(Ordering::SeqCst), 19 * 4);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let fake = FakeProviders::new();
    let enrichment = pipeline(&fake);
    let mut document = parse_itinerary_response(&itinerary_response("Leh", 2, 3)).unwrap();

    enrichment.enrich_all(&mut document, DESTINATION).await;
    let once = document.clone();
    enrichment.enrich_all(&mut document, DESTINATION).await;

    assert_eq!(document, once);
}

#[tokio::test]
async fn test_routing_failure_skips_modes_only() {
    let fake = FakeProviders::new();
    fake.fail_routing.store(true, Ordering::SeqCst);
    let mut document = long_day(3);

    let report = pipeline(&fake).enrich_day(&mut document, 0, DESTINATION).await.unwrap();

    assert!(document.days[0].places.iter().all(|p| p.travel_modes.is_none()));
    assert!(document.days[0].places.iter().all(|p| p.coordinates.is_some()));
    assert_eq!(report.photos_fetched, 3);
}

#[tokio::test]
async fn test_missing_coordinates_skip_hops() {
    let fake = FakeProviders::new();
    fake.fail_geocoding.store(true, Ordering::SeqCst);
    let mut document = long_day(3);

    let report = pipeline(&fake).enrich_day(&mut document, 0, DESTINATION).await.unwrap();

    assert_eq!(report.coordinates_missing, 3);
    assert_eq!(report.hops_skipped, 2);
    assert_eq!(fake.route_calls.load(Ordering::SeqCst), 0);
    assert!(document.map_locations.is_empty());
}

#[tokio::test]
async fn test_empty_day_is_a_no_op() {
    let fake = FakeProviders::new();
    let mut document = long_day(0);

    let report = pipeline(&fake).enrich_day(&mut document, 0, DESTINATION).await.unwrap();
    assert_eq!(report.photos_fetched + report.photos_defaulted, 0);
    assert_eq!(fake.enrichment_calls(), 0);
}
