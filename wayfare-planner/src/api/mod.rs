//! HTTP API handlers for wayfare-planner
//!
//! Thin JSON wrappers over [`PipelineOrchestrator`](crate::services::PipelineOrchestrator)
//! operations plus an SSE stream of per-group pipeline events.

pub mod events;
pub mod flights;
pub mod groups;
pub mod health;
pub mod itinerary;
pub mod votes;

pub use events::event_routes;
pub use flights::flight_routes;
pub use groups::group_routes;
pub use health::health_routes;
pub use itinerary::itinerary_routes;
pub use votes::vote_routes;
