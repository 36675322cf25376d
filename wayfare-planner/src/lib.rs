//! wayfare-planner library interface
//!
//! Exposes the pipeline, providers and HTTP router for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod providers;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, PipelineError, PipelineResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wayfare_common::events::EventBus;

use crate::services::PipelineOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last server-side failure, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, orchestrator: PipelineOrchestrator) -> Self {
        Self {
            db,
            event_bus: orchestrator.event_bus().clone(),
            orchestrator: Arc::new(orchestrator),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Convert an operation result for a handler, remembering server-side failures
    pub async fn track<T>(&self, result: PipelineResult<T>) -> ApiResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_server_side() {
                    *self.last_error.write().await = Some(err.to_string());
                }
                Err(err.into())
            }
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::group_routes())
        .merge(api::flight_routes())
        .merge(api::itinerary_routes())
        .merge(api::vote_routes())
        .merge(api::event_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
