//! Flight offer models
//!
//! A [`FlightOffer`] is one raw card returned by the scraping service; a
//! [`ParsedFlight`] is the structured form produced by the flight text parser.

use serde::{Deserialize, Serialize};

/// Sentinel for any field the parser could not resolve
pub const UNKNOWN: &str = "Unknown";

/// Sentinel price when the card carries no `INR` amount
pub const PRICE_NOT_AVAILABLE: &str = "Price not available";

/// Raw flight-offer card as scraped from the booking site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub index: usize,
    pub text_content: String,
}

/// One direction of a round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLeg {
    pub departure_time: String,
    pub departure_airport: String,
    pub departure_date: String,
    pub arrival_time: String,
    pub arrival_airport: String,
    pub arrival_date: String,
    pub duration: String,
    pub stops: String,
    pub airline: String,
}

impl FlightLeg {
    /// Leg with every field set to [`UNKNOWN`]
    pub fn unknown() -> Self {
        Self {
            departure_time: UNKNOWN.to_string(),
            departure_airport: UNKNOWN.to_string(),
            departure_date: UNKNOWN.to_string(),
            arrival_time: UNKNOWN.to_string(),
            arrival_airport: UNKNOWN.to_string(),
            arrival_date: UNKNOWN.to_string(),
            duration: UNKNOWN.to_string(),
            stops: UNKNOWN.to_string(),
            airline: UNKNOWN.to_string(),
        }
    }
}

/// Structured round-trip offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFlight {
    /// Index of the source [`FlightOffer`]
    pub index: usize,
    /// Promotional text preceding the itinerary, if any
    pub banner: Option<String>,
    pub outbound: FlightLeg,
    #[serde(rename = "return")]
    pub return_leg: FlightLeg,
    pub airlines: Vec<String>,
    /// Amount without currency prefix, or [`PRICE_NOT_AVAILABLE`]
    pub price: String,
    /// `"INR"` when a price was found, otherwise [`UNKNOWN`]
    pub currency: String,
    pub ticket_class: Option<String>,
}
