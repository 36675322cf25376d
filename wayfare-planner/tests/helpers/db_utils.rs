//! Database Test Utilities

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Single-connection in-memory database with the full schema
///
/// One connection only: every `:memory:` connection is a separate database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    wayfare_common::db::create_schema(&pool).await.unwrap();
    pool
}

/// On-disk database opened the way the service opens it (WAL, pooled)
///
/// Returns (TempDir, SqlitePool); the TempDir must outlive the pool.
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("wayfare.db");
    let pool = wayfare_common::db::init_database(&db_path).await.unwrap();
    (temp_dir, pool)
}

/// Make every write to `travel_groups.itinerary` fail
pub async fn fail_itinerary_writes(pool: &SqlitePool) {
    sqlx::query(
        "CREATE TRIGGER fail_itinerary_write BEFORE UPDATE OF itinerary ON travel_groups
         BEGIN SELECT RAISE(ABORT, 'itinerary write rejected'); END",
    )
    .execute(pool)
    .await
    .unwrap();
}

/// (user_id, regenerate_vote) for every member, ordered by user id
pub async fn regenerate_flags(pool: &SqlitePool, group_id: Uuid) -> Vec<(String, bool)> {
    sqlx::query_as(
        "SELECT user_id, regenerate_vote FROM group_members WHERE group_id = ? ORDER BY user_id",
    )
    .bind(group_id.to_string())
    .fetch_all(pool)
    .await
    .unwrap()
}

pub async fn regeneration_token(pool: &SqlitePool, group_id: Uuid) -> Option<String> {
    sqlx::query_scalar("SELECT regeneration_token FROM travel_groups WHERE group_id = ?")
        .bind(group_id.to_string())
        .fetch_one(pool)
        .await
        .unwrap()
}
