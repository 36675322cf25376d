//! Integration tests for on-disk database initialization

use wayfare_common::db::init::init_database;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wayfare.db");

    let pool = init_database(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wayfare.db");

    let first = init_database(&db_path).await.unwrap();
    first.close().await;

    let second = init_database(&db_path).await;
    assert!(second.is_ok(), "Failed to open existing database: {:?}", second.err());
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("wayfare.db")).await.unwrap();

    for (key, expected) in [
        ("database_busy_timeout_ms", "250"),
        ("database_max_lock_wait_ms", "5000"),
        ("regeneration_lease_secs", "600"),
    ] {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some(expected), "setting {}", key);
    }

    // Left unset so the TOML call timeout applies
    let call_timeout: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'provider_call_timeout_ms'")
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert!(call_timeout.is_none());
}

#[tokio::test]
async fn test_existing_setting_values_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wayfare.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("UPDATE settings SET value = '120' WHERE key = 'regeneration_lease_secs'")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let value: String =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'regeneration_lease_secs'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(value, "120");
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("wayfare.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_member_rows_cascade_with_group() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("wayfare.db")).await.unwrap();

    // Single connection so the foreign_keys pragma applies to every statement
    let mut conn = pool.acquire().await.unwrap();
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await.unwrap();

    sqlx::query(
        "INSERT INTO travel_groups (group_id, destination, destination_display, host_user_id,
         trip_duration_days, created_at, updated_at)
         VALUES ('g1', 'Leh, India', 'Leh', 'host', 4, 'now', 'now')",
    )
    .execute(&mut *conn)
    .await
    .unwrap();
    sqlx::query("INSERT INTO group_members (group_id, user_id, joined_at) VALUES ('g1', 'host', 'now')")
        .execute(&mut *conn)
        .await
        .unwrap();

    let duplicate =
        sqlx::query("INSERT INTO group_members (group_id, user_id, joined_at) VALUES ('g1', 'host', 'now')")
            .execute(&mut *conn)
            .await;
    assert!(duplicate.is_err(), "second row for the same (group, user) must be rejected");

    sqlx::query("DELETE FROM travel_groups WHERE group_id = 'g1'")
        .execute(&mut *conn)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM group_members")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
