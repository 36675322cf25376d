//! Unit tests for database settings accessors

mod helpers;

use wayfare_planner::db::settings::{
    get_llm_api_key, get_setting, max_lock_wait_ms, regeneration_lease_secs, set_setting,
    LLM_API_KEY,
};

use helpers::memory_pool;

#[tokio::test]
async fn test_api_key_round_trip() {
    let pool = memory_pool().await;
    assert_eq!(get_llm_api_key(&pool).await.unwrap(), None);

    set_setting(&pool, LLM_API_KEY, "sk-test-123").await.unwrap();
    assert_eq!(get_llm_api_key(&pool).await.unwrap().as_deref(), Some("sk-test-123"));

    set_setting(&pool, LLM_API_KEY, "sk-test-456").await.unwrap();
    let row: (String,) = sqlx::query_as("SELECT value FROM settings WHERE key = 'llm_api_key'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, "sk-test-456");
}

#[tokio::test]
async fn test_seeded_tunables() {
    let pool = memory_pool().await;
    assert_eq!(max_lock_wait_ms(&pool).await.unwrap(), 5000);
    assert_eq!(regeneration_lease_secs(&pool).await.unwrap(), 600);

    set_setting(&pool, "regeneration_lease_secs", 90).await.unwrap();
    assert_eq!(regeneration_lease_secs(&pool).await.unwrap(), 90);
}

#[tokio::test]
async fn test_unparseable_setting_is_config_error() {
    let pool = memory_pool().await;
    set_setting(&pool, "database_max_lock_wait_ms", "soon").await.unwrap();

    let result = max_lock_wait_ms(&pool).await;
    assert!(matches!(result, Err(wayfare_common::Error::Config(_))));

    let missing: Option<u64> = get_setting(&pool, "no_such_key").await.unwrap();
    assert_eq!(missing, None);
}
