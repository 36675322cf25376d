//! # Wayfare Common Library
//!
//! Shared code for the Wayfare crates:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - SQLite schema initialization
//! - Itinerary document types
//! - Event bus and SSE helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod itinerary;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use itinerary::ItineraryDocument;
