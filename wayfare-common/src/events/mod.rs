//! Event types for the Wayfare event system
//!
//! Pipeline operations publish [`WayfareEvent`]s on an [`EventBus`]; the HTTP
//! layer forwards the events of one group to its SSE subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Wayfare pipeline events
///
/// Every variant belongs to exactly one travel group, so subscribers can filter
/// with [`WayfareEvent::group_id`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WayfareEvent {
    /// A new travel group was created by its host
    GroupCreated {
        group_id: Uuid,
        destination: String,
        timestamp: DateTime<Utc>,
    },

    /// A member joined or updated their preferences
    MemberJoined {
        group_id: Uuid,
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A member left the group
    MemberLeft {
        group_id: Uuid,
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The last member left and the group row was deleted
    GroupDissolved {
        group_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Travel dates fixed and booking URL generated
    TravelDatesDetermined {
        group_id: Uuid,
        booking_url: String,
        timestamp: DateTime<Utc>,
    },

    /// Scraped flight cards were parsed
    FlightOptionsParsed {
        group_id: Uuid,
        /// Number of offers returned by the scraper
        offer_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A new itinerary document was generated and persisted
    ItineraryGenerated {
        group_id: Uuid,
        itinerary_version: i64,
        day_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// One day of the itinerary finished enrichment
    DayEnriched {
        group_id: Uuid,
        day_index: usize,
        photos_fetched: usize,
        photos_defaulted: usize,
        hops_routed: usize,
        timestamp: DateTime<Utc>,
    },

    /// A member voted to regenerate the itinerary
    RegenerateVoteCast {
        group_id: Uuid,
        user_id: String,
        votes: usize,
        total: usize,
        threshold: usize,
        timestamp: DateTime<Utc>,
    },

    /// Majority reached and this process claimed the regeneration lease
    RegenerationStarted {
        group_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Regenerated itinerary persisted and votes reset
    RegenerationCompleted {
        group_id: Uuid,
        itinerary_version: i64,
        timestamp: DateTime<Utc>,
    },

    /// Regeneration attempt failed; votes were left untouched
    RegenerationFailed {
        group_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Hotel plurality vote produced a winner
    HotelWinnerSelected {
        group_id: Uuid,
        hotel_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl WayfareEvent {
    /// Get event type as string for SSE event names
    pub fn event_type(&self) -> &'static str {
        match self {
            WayfareEvent::GroupCreated { .. } => "GroupCreated",
            WayfareEvent::MemberJoined { .. } => "MemberJoined",
            WayfareEvent::MemberLeft { .. } => "MemberLeft",
            WayfareEvent::GroupDissolved { .. } => "GroupDissolved",
            WayfareEvent::TravelDatesDetermined { .. } => "TravelDatesDetermined",
            WayfareEvent::FlightOptionsParsed { .. } => "FlightOptionsParsed",
            WayfareEvent::ItineraryGenerated { .. } => "ItineraryGenerated",
            WayfareEvent::DayEnriched { .. } => "DayEnriched",
            WayfareEvent::RegenerateVoteCast { .. } => "RegenerateVoteCast",
            WayfareEvent::RegenerationStarted { .. } => "RegenerationStarted",
            WayfareEvent::RegenerationCompleted { .. } => "RegenerationCompleted",
            WayfareEvent::RegenerationFailed { .. } => "RegenerationFailed",
            WayfareEvent::HotelWinnerSelected { .. } => "HotelWinnerSelected",
        }
    }

    /// Group the event belongs to
    pub fn group_id(&self) -> Uuid {
        match self {
            WayfareEvent::GroupCreated { group_id, .. }
            | WayfareEvent::MemberJoined { group_id, .. }
            | WayfareEvent::MemberLeft { group_id, .. }
            | WayfareEvent::GroupDissolved { group_id, .. }
            | WayfareEvent::TravelDatesDetermined { group_id, .. }
            | WayfareEvent::FlightOptionsParsed { group_id, .. }
            | WayfareEvent::ItineraryGenerated { group_id, .. }
            | WayfareEvent::DayEnriched { group_id, .. }
            | WayfareEvent::RegenerateVoteCast { group_id, .. }
            | WayfareEvent::RegenerationStarted { group_id, .. }
            | WayfareEvent::RegenerationCompleted { group_id, .. }
            | WayfareEvent::RegenerationFailed { group_id, .. }
            | WayfareEvent::HotelWinnerSelected { group_id, .. } => *group_id,
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and miss
/// events rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WayfareEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<WayfareEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WayfareEvent,
    ) -> Result<usize, broadcast::error::SendError<WayfareEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WayfareEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
