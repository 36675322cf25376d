//! Travel group model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use wayfare_common::ItineraryDocument;

use super::flight::ParsedFlight;

/// Cabin class accepted by the booking search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CabinClass {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "ECONOMY",
            CabinClass::PremiumEconomy => "PREMIUM_ECONOMY",
            CabinClass::Business => "BUSINESS",
            CabinClass::First => "FIRST",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "ECONOMY" => Ok(CabinClass::Economy),
            "PREMIUM_ECONOMY" => Ok(CabinClass::PremiumEconomy),
            "BUSINESS" => Ok(CabinClass::Business),
            "FIRST" => Ok(CabinClass::First),
            other => Err(format!("unknown cabin class '{}'", other)),
        }
    }
}

/// Trip parameters fixed once the group settles on dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelDates {
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub departure_iata: String,
    pub destination_iata: String,
    pub adult_count: u32,
    #[serde(default)]
    pub cabin_class: CabinClass,
}

/// Prompt and raw response of the most recent itinerary generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub prompt: String,
    pub response: String,
    pub generated_at: DateTime<Utc>,
}

/// One trip shared by a group of members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelGroup {
    pub group_id: Uuid,
    /// Raw destination as entered, e.g. `"Leh, Ladakh, India"`
    pub destination: String,
    pub destination_display: String,
    pub host_user_id: String,
    pub trip_duration_days: u32,
    /// Present once `travel_dates_determined` is true
    pub travel_dates: Option<TravelDates>,
    pub travel_dates_determined: bool,
    pub booking_url: Option<String>,
    pub itinerary: Option<ItineraryDocument>,
    /// Bumped on every itinerary write
    pub itinerary_version: i64,
    pub last_generation: Option<GenerationRecord>,
    pub selected_flight: Option<ParsedFlight>,
    pub final_hotel_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelGroup {
    /// New group with no dates, itinerary or votes
    pub fn new(
        destination: String,
        destination_display: String,
        host_user_id: String,
        trip_duration_days: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            group_id: Uuid::new_v4(),
            destination,
            destination_display,
            host_user_id,
            trip_duration_days,
            travel_dates: None,
            travel_dates_determined: false,
            booking_url: None,
            itinerary: None,
            itinerary_version: 0,
            last_generation: None,
            selected_flight: None,
            final_hotel_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
