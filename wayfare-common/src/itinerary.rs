//! Itinerary document types
//!
//! The itinerary is stored as camelCase JSON in `travel_groups.itinerary`. Fields
//! produced by enrichment (`imageUrl`, `coordinates`, `travelModes`) are
//! optional so a freshly generated document and a fully enriched one share the
//! same type.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A complete trip plan owned by one travel group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDocument {
    #[serde(default)]
    pub days: Vec<Day>,
    #[serde(default)]
    pub hotels: Vec<Hotel>,
    #[serde(default)]
    pub flights: Vec<Flight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<String>,
    #[serde(default)]
    pub map_locations: Vec<MapLocation>,
}

/// One calendar day of the trip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    #[serde(default)]
    pub date: String,
    #[serde(default, alias = "day")]
    pub day_name: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub places: Vec<Place>,
}

/// Category of a place
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    Monument,
    Museum,
    Park,
    Food,
    Shopping,
    PhotoSpot,
    Historical,
    Entertainment,
    Cultural,
    Nature,
    /// Anything the generator invents outside the known set
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Travel mode for a hop between consecutive places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    Bicycling,
    Driving,
    Transit,
}

impl TravelMode {
    /// The four modes queried for every hop, in query order
    pub const ALL: [TravelMode; 4] = [
        TravelMode::Walking,
        TravelMode::Bicycling,
        TravelMode::Driving,
        TravelMode::Transit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
        }
    }
}

/// Human-readable duration and distance for one mode of one hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelLeg {
    pub duration: String,
    pub distance: String,
}

pub type TravelModes = BTreeMap<TravelMode, TravelLeg>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(rename = "type", default)]
    pub place_type: PlaceType,
    #[serde(default)]
    pub visit_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Hop from the previous place of the same day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_modes: Option<TravelModes>,
}

impl Place {
    /// Merge freshly routed modes into the stored map
    ///
    /// New results overwrite modes with the same name; modes missing from
    /// `fresh` keep their previous values. An empty merge leaves the field unset.
    pub fn merge_travel_modes(&mut self, fresh: TravelModes) {
        let mut merged = self.travel_modes.take().unwrap_or_default();
        merged.extend(fresh);
        self.travel_modes = if merged.is_empty() { None } else { Some(merged) };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_rating")]
    pub rating: Option<f64>,
    /// Currency-prefixed price, e.g. `"INR 4,500"` or `"$150"`
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Flight suggestion embedded in a generated itinerary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    #[serde(default)]
    pub airline: String,
    #[serde(default)]
    pub departure: String,
    #[serde(default)]
    pub arrival: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub price: String,
}

/// Map pin derived from a place with coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLocation {
    pub place_id: String,
    pub name: String,
    pub day_index: usize,
    pub coordinates: Coordinates,
}

/// Ratings arrive as numbers or numeric strings depending on the generator
fn deserialize_rating<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl ItineraryDocument {
    /// Enforce the structural invariants of a document
    ///
    /// Assigns ids to places and hotels whose id is empty or already taken and
    /// removes travel-mode data from the first place of every day. Returns the
    /// number of ids assigned.
    pub fn normalize(&mut self) -> usize {
        let mut assigned = 0;

        let mut seen_places: HashSet<String> = HashSet::new();
        for (day_index, day) in self.days.iter_mut().enumerate() {
            for (place_index, place) in day.places.iter_mut().enumerate() {
                let id = place.id.trim().to_string();
                if id.is_empty() || seen_places.contains(&id) {
                    place.id = unique_id(&seen_places, &format!("place-{}-{}", day_index + 1, place_index + 1));
                    assigned += 1;
                } else {
                    place.id = id;
                }
                seen_places.insert(place.id.clone());
            }

            if let Some(first) = day.places.first_mut() {
                first.travel_modes = None;
            }
        }

        let mut seen_hotels: HashSet<String> = HashSet::new();
        for (hotel_index, hotel) in self.hotels.iter_mut().enumerate() {
            let id = hotel.id.trim().to_string();
            if id.is_empty() || seen_hotels.contains(&id) {
                hotel.id = unique_id(&seen_hotels, &format!("hotel-{}", hotel_index + 1));
                assigned += 1;
            } else {
                hotel.id = id;
            }
            seen_hotels.insert(hotel.id.clone());
        }

        assigned
    }

    /// Rebuild `map_locations` from place coordinates, in day then list order
    pub fn recompute_map_locations(&mut self) {
        self.map_locations = self
            .days
            .iter()
            .enumerate()
            .flat_map(|(day_index, day)| {
                day.places.iter().filter_map(move |place| {
                    place.coordinates.map(|coordinates| MapLocation {
                        place_id: place.id.clone(),
                        name: place.name.clone(),
                        day_index,
                        coordinates,
                    })
                })
            })
            .collect();
    }

    /// All place ids across every day
    pub fn place_ids(&self) -> Vec<&str> {
        self.days
            .iter()
            .flat_map(|day| day.places.iter().map(|p| p.id.as_str()))
            .collect()
    }

    pub fn has_place(&self, place_id: &str) -> bool {
        self.days
            .iter()
            .any(|day| day.places.iter().any(|p| p.id == place_id))
    }

    pub fn hotel(&self, hotel_id: &str) -> Option<&Hotel> {
        self.hotels.iter().find(|h| h.id == hotel_id)
    }
}

impl Day {
    /// True when both days list the same place ids in the same order
    pub fn same_places(&self, other: &Day) -> bool {
        self.places.len() == other.places.len()
            && self
                .places
                .iter()
                .zip(&other.places)
                .all(|(a, b)| a.id == b.id)
    }
}

fn unique_id(taken: &HashSet<String>, base: &str) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(duration: &str) -> TravelLeg {
        TravelLeg {
            duration: duration.to_string(),
            distance: "1 km".to_string(),
        }
    }

    #[test]
    fn test_deserializes_generator_output() {
        let json = r#"{
            "days": [{
                "date": "26",
                "day": "Saturday",
                "month": "Jul",
                "places": [
                    {"id": "p1", "name": "Shanti Stupa", "type": "monument", "visitTime": "06:00"},
                    {"name": "Leh Palace", "type": "castle"}
                ]
            }],
            "hotels": [{"name": "Grand Dragon", "rating": "4.5", "price": "INR 9,000", "amenities": ["wifi"]}],
            "budgetRange": "INR 40,000 - 60,000"
        }"#;

        let doc: ItineraryDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.days[0].day_name, "Saturday");
        assert_eq!(doc.days[0].places[0].place_type, PlaceType::Monument);
        assert_eq!(doc.days[0].places[1].place_type, PlaceType::Other);
        assert_eq!(doc.hotels[0].rating, Some(4.5));
        assert!(doc.flights.is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut place = Place {
            id: "p1".to_string(),
            name: "Pangong".to_string(),
            place_type: PlaceType::PhotoSpot,
            image_url: Some("https://img".to_string()),
            ..Default::default()
        };
        place.merge_travel_modes(BTreeMap::from([(TravelMode::Driving, leg("5 hours"))]));

        let value = serde_json::to_value(&place).unwrap();
        assert_eq!(value["type"], "photo_spot");
        assert_eq!(value["imageUrl"], "https://img");
        assert_eq!(value["travelModes"]["driving"]["duration"], "5 hours");
        assert!(value.get("coordinates").is_none());
    }

    #[test]
    fn test_normalize_assigns_missing_and_duplicate_ids() {
        let mut doc = ItineraryDocument {
            days: vec![
                Day {
                    places: vec![
                        Place { id: "a".into(), name: "A".into(), ..Default::default() },
                        Place { id: "".into(), name: "B".into(), ..Default::default() },
                    ],
                    ..Default::default()
                },
                Day {
                    places: vec![Place { id: "a".into(), name: "C".into(), ..Default::default() }],
                    ..Default::default()
                },
            ],
            hotels: vec![
                Hotel { id: "h".into(), name: "H1".into(), ..Default::default() },
                Hotel { id: "h".into(), name: "H2".into(), ..Default::default() },
            ],
            ..Default::default()
        };

        assert_eq!(doc.normalize(), 3);
        assert_eq!(doc.place_ids(), vec!["a", "place-1-2", "place-2-1"]);
        assert_eq!(doc.hotels[1].id, "hotel-2");

        // Second pass is a no-op
        assert_eq!(doc.normalize(), 0);
    }

    #[test]
    fn test_normalize_strips_first_place_travel_modes() {
        let mut first = Place { id: "a".into(), name: "A".into(), ..Default::default() };
        first.merge_travel_modes(BTreeMap::from([(TravelMode::Walking, leg("3 mins"))]));
        let mut second = Place { id: "b".into(), name: "B".into(), ..Default::default() };
        second.merge_travel_modes(BTreeMap::from([(TravelMode::Walking, leg("8 mins"))]));

        let mut doc = ItineraryDocument {
            days: vec![Day { places: vec![first, second], ..Default::default() }],
            ..Default::default()
        };
        doc.normalize();

        assert!(doc.days[0].places[0].travel_modes.is_none());
        assert!(doc.days[0].places[1].travel_modes.is_some());
    }

    #[test]
    fn test_merge_travel_modes_keeps_previous_modes() {
        let mut place = Place::default();
        place.merge_travel_modes(BTreeMap::from([
            (TravelMode::Walking, leg("10 mins")),
            (TravelMode::Transit, leg("4 mins")),
        ]));
        place.merge_travel_modes(BTreeMap::from([(TravelMode::Walking, leg("9 mins"))]));

        let modes = place.travel_modes.unwrap();
        assert_eq!(modes.len(), 2);
        assert_eq!(modes[&TravelMode::Walking].duration, "9 mins");
        assert_eq!(modes[&TravelMode::Transit].duration, "4 mins");
    }

    #[test]
    fn test_recompute_map_locations_skips_places_without_coordinates() {
        let mut doc = ItineraryDocument {
            days: vec![Day {
                places: vec![
                    Place {
                        id: "a".into(),
                        name: "A".into(),
                        coordinates: Some(Coordinates { lat: 34.1, lng: 77.5 }),
                        ..Default::default()
                    },
                    Place { id: "b".into(), name: "B".into(), ..Default::default() },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };

        doc.recompute_map_locations();
        assert_eq!(doc.map_locations.len(), 1);
        assert_eq!(doc.map_locations[0].place_id, "a");
        assert_eq!(doc.map_locations[0].day_index, 0);
    }
}
