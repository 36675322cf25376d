//! Pipeline services
//!
//! Pure computations (flight text parsing, booking URL building, vote tallies,
//! AI response extraction, prompts), provider-backed enrichment, and the
//! orchestrator that sequences them against storage.

pub mod booking_url;
pub mod consensus;
pub mod enrichment;
pub mod flight_parser;
pub mod iata;
pub mod itinerary_json;
pub mod orchestrator;
pub mod prompts;

pub use booking_url::{booking_url_for, build_booking_url, BookingUrlError};
pub use consensus::{
    majority_threshold, tally_hotel_votes, tally_regenerate_votes, HotelVoteOutcome,
    PlaceVoteSummary, RegenerationTally, WinnerRule,
};
pub use enrichment::{EnrichmentPipeline, EnrichmentReport};
pub use flight_parser::{parse_flight_offer, parse_flight_options};
pub use itinerary_json::{extract_json_object, parse_itinerary_response};
pub use orchestrator::{
    CreateGroupRequest, DayEnrichment, FlightOptions, JoinGroupRequest, LeaveOutcome,
    PipelineOrchestrator, RegenerateVoteOutcome, RegenerationStatus,
};
