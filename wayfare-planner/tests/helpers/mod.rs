//! Test Helper Utilities
//!
//! Shared utilities for testing wayfare-planner

#![allow(dead_code)]

pub mod db_utils;
pub mod fake_providers;

pub use db_utils::{
    create_test_db, fail_itinerary_writes, memory_pool, regeneration_token, regenerate_flags,
};
pub use fake_providers::{itinerary_response, FakeProviders, DEFAULT_IMAGE};

use std::time::Duration;
use sqlx::SqlitePool;
use wayfare_common::events::EventBus;
use wayfare_planner::config::ProviderSettings;
use wayfare_planner::models::{MemberPreferences, TravelGroup};
use wayfare_planner::services::{CreateGroupRequest, JoinGroupRequest, PipelineOrchestrator};

/// Provider settings with short deadlines and a recognisable default image
pub fn test_settings() -> ProviderSettings {
    ProviderSettings {
        call_timeout: Duration::from_millis(500),
        generation_timeout: Duration::from_secs(2),
        default_image_url: DEFAULT_IMAGE.to_string(),
        ..ProviderSettings::default()
    }
}

pub fn test_orchestrator(pool: &SqlitePool, fake: &std::sync::Arc<FakeProviders>) -> PipelineOrchestrator {
    PipelineOrchestrator::new(pool.clone(), fake.providers(), EventBus::new(64), &test_settings())
}

/// Create a group hosted by `user_ids[0]` and join the remaining users
pub async fn seed_group(orchestrator: &PipelineOrchestrator, user_ids: &[&str]) -> TravelGroup {
    let group = orchestrator
        .create_group(CreateGroupRequest {
            destination: "Leh, Ladakh, India".to_string(),
            destination_display: None,
            host_user_id: user_ids[0].to_string(),
            host_display_name: None,
            trip_duration_days: 2,
            preferences: MemberPreferences {
                interests: Some("monasteries".to_string()),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    for user_id in &user_ids[1..] {
        orchestrator
            .join_group(
                group.group_id,
                JoinGroupRequest {
                    user_id: user_id.to_string(),
                    display_name: None,
                    preferences: MemberPreferences::default(),
                },
            )
            .await
            .unwrap();
    }

    group
}
