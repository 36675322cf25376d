//! Database initialization
//!
//! Creates the database on first run and brings the schema up to date on every
//! start. All statements are idempotent, so calling [`create_schema`] against an
//! existing database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets enrichment reads proceed while a vote write holds the lock
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    create_schema(&pool).await?;

    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(250);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    info!("Database busy timeout set to {} ms", timeout_ms);

    Ok(pool)
}

/// Create every Wayfare table and default setting
///
/// Used by [`init_database`] and by tests running against in-memory pools.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_settings_table(pool).await?;
    create_travel_groups_table(pool).await?;
    create_group_members_table(pool).await?;
    init_default_settings(pool).await?;

    debug!("Schema ready (settings, travel_groups, group_members)");
    Ok(())
}

/// Create the settings table
///
/// Stores provider API keys and tunables as key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the travel_groups table
///
/// One row per trip. The CHECK constraint enforces that a booking URL exists
/// whenever travel dates are marked as determined.
pub async fn create_travel_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS travel_groups (
            group_id TEXT PRIMARY KEY,
            destination TEXT NOT NULL,
            destination_display TEXT NOT NULL,
            host_user_id TEXT NOT NULL,
            trip_duration_days INTEGER NOT NULL,
            departure_date TEXT,
            return_date TEXT,
            departure_iata TEXT,
            destination_iata TEXT,
            cabin_class TEXT,
            adult_count INTEGER,
            travel_dates_determined INTEGER NOT NULL DEFAULT 0,
            booking_url TEXT,
            itinerary TEXT,
            itinerary_version INTEGER NOT NULL DEFAULT 0,
            generation_prompt TEXT,
            generation_response TEXT,
            generated_at TEXT,
            selected_flight TEXT,
            final_hotel_id TEXT,
            regeneration_token TEXT,
            regeneration_started_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (travel_dates_determined = 0 OR booking_url IS NOT NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the group_members table
///
/// The composite primary key enforces at most one row per (group, user).
pub async fn create_group_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS group_members (
            group_id TEXT NOT NULL REFERENCES travel_groups(group_id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            display_name TEXT,
            interests TEXT,
            budget TEXT,
            schedule TEXT,
            travel_style TEXT,
            dietary TEXT,
            accessibility TEXT,
            notes TEXT,
            regenerate_vote INTEGER NOT NULL DEFAULT 0,
            itinerary_feedback TEXT,
            selected_hotel TEXT,
            place_votes TEXT NOT NULL DEFAULT '{}',
            all_places_voted INTEGER NOT NULL DEFAULT 0,
            joined_at TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_group_members_group ON group_members(group_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize default settings
///
/// Missing keys are inserted; NULL values are reset to the default.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "database_busy_timeout_ms", "250").await?;
    ensure_setting(pool, "database_max_lock_wait_ms", "5000").await?;
    ensure_setting(pool, "regeneration_lease_secs", "600").await?;
    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // INSERT OR IGNORE tolerates two processes initializing concurrently
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let reset = sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default_value)
        .bind(key)
        .execute(pool)
        .await?
        .rows_affected();

    if reset > 0 {
        info!("Reset NULL setting '{}' to default value: {}", key, default_value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = memory_pool().await;
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["group_members", "settings", "travel_groups"]);
    }

    #[tokio::test]
    async fn test_null_setting_reset_to_default() {
        let pool = memory_pool().await;
        create_schema(&pool).await.unwrap();

        sqlx::query("UPDATE settings SET value = NULL WHERE key = 'regeneration_lease_secs'")
            .execute(&pool)
            .await
            .unwrap();

        create_schema(&pool).await.unwrap();

        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = 'regeneration_lease_secs'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(value.as_deref(), Some("600"));
    }

    #[tokio::test]
    async fn test_booking_url_check_constraint() {
        let pool = memory_pool().await;
        create_schema(&pool).await.unwrap();

        let result = sqlx::query(
            r#"
            INSERT INTO travel_groups (
                group_id, destination, destination_display, host_user_id,
                trip_duration_days, travel_dates_determined, created_at, updated_at
            ) VALUES ('g1', 'Leh, India', 'Leh', 'u1', 5, 1, 'now', 'now')
            "#,
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "dates determined without booking URL must be rejected");
    }
}
