//! Data models for wayfare-planner
//!
//! - Travel groups and their members (rows of `travel_groups` / `group_members`)
//! - Scraped and parsed flight offers

pub mod flight;
pub mod group;
pub mod member;

pub use flight::{FlightLeg, FlightOffer, ParsedFlight, PRICE_NOT_AVAILABLE, UNKNOWN};
pub use group::{CabinClass, GenerationRecord, TravelDates, TravelGroup};
pub use member::{GroupMember, MemberPreferences, PlaceVote};
