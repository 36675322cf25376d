//! Settings table accessors
//!
//! Key/value rows holding provider API keys and runtime tunables. Defaults for
//! the tunables are seeded by `wayfare_common::db::init`; the getters here also
//! fall back to the same defaults when a row is missing.

use sqlx::{Pool, Sqlite};
use wayfare_common::{Error, Result};

pub const UNSPLASH_ACCESS_KEY: &str = "unsplash_access_key";
pub const GOOGLE_MAPS_API_KEY: &str = "google_maps_api_key";
pub const LLM_API_KEY: &str = "llm_api_key";

pub async fn get_unsplash_access_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting(db, UNSPLASH_ACCESS_KEY).await
}

pub async fn get_google_maps_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting(db, GOOGLE_MAPS_API_KEY).await
}

pub async fn get_llm_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting(db, LLM_API_KEY).await
}

/// Upper bound for lock retries (default 5000 ms)
pub async fn max_lock_wait_ms(db: &Pool<Sqlite>) -> Result<u64> {
    get_setting(db, "database_max_lock_wait_ms")
        .await
        .map(|opt| opt.unwrap_or(5000))
}

/// Age after which a regeneration lease is treated as abandoned (default 600 s)
pub async fn regeneration_lease_secs(db: &Pool<Sqlite>) -> Result<i64> {
    get_setting(db, "regeneration_lease_secs")
        .await
        .map(|opt| opt.unwrap_or(600))
}

/// Per-call provider timeout stored in the database, if any
pub async fn provider_call_timeout_ms(db: &Pool<Sqlite>) -> Result<Option<u64>> {
    get_setting(db, "provider_call_timeout_ms").await
}

/// Read and parse a setting; `None` when the row is absent or NULL
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row.and_then(|(value,)| value) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Setting '{}' has invalid value '{}': {}", key, value, e))),
        None => Ok(None),
    }
}

/// Insert or overwrite a setting
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}
