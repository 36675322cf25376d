//! Group member persistence

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;
use wayfare_common::time::{parse_db_timestamp, to_db_timestamp};
use wayfare_common::{Error, Result};

use super::settings::max_lock_wait_ms;
use crate::models::{GroupMember, MemberPreferences, PlaceVote};
use crate::utils::retry_on_lock;

const MEMBER_COLUMNS: &str = r#"
    group_id, user_id, display_name,
    interests, budget, schedule, travel_style, dietary, accessibility, notes,
    regenerate_vote, itinerary_feedback, selected_hotel, place_votes, all_places_voted,
    joined_at
"#;

/// Plain INSERT of a complete member row
///
/// Generic over the executor so group creation can insert the host inside its
/// transaction.
pub async fn insert_member<'e, E>(executor: E, member: &GroupMember) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let place_votes = serialize_place_votes(&member.place_votes)?;
    let prefs = &member.preferences;

    sqlx::query(
        r#"
        INSERT INTO group_members (
            group_id, user_id, display_name,
            interests, budget, schedule, travel_style, dietary, accessibility, notes,
            regenerate_vote, itinerary_feedback, selected_hotel, place_votes, all_places_voted,
            joined_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(member.group_id.to_string())
    .bind(&member.user_id)
    .bind(&member.display_name)
    .bind(&prefs.interests)
    .bind(&prefs.budget)
    .bind(&prefs.schedule)
    .bind(&prefs.travel_style)
    .bind(&prefs.dietary)
    .bind(&prefs.accessibility)
    .bind(&prefs.notes)
    .bind(member.regenerate_vote)
    .bind(&member.itinerary_feedback)
    .bind(&member.selected_hotel)
    .bind(place_votes)
    .bind(member.all_places_voted)
    .bind(to_db_timestamp(member.joined_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// Join a group or update an existing member's preferences
///
/// Only identity and preference columns are written; votes of an existing
/// member are left untouched. A `None` display name keeps the stored one.
pub async fn upsert_member(
    pool: &SqlitePool,
    group_id: Uuid,
    user_id: &str,
    display_name: Option<&str>,
    prefs: &MemberPreferences,
) -> Result<()> {
    let group_id = group_id.to_string();
    let joined_at = to_db_timestamp(Utc::now());
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("upsert_member", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO group_members (
                group_id, user_id, display_name,
                interests, budget, schedule, travel_style, dietary, accessibility, notes,
                joined_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(group_id, user_id) DO UPDATE SET
                display_name = COALESCE(excluded.display_name, display_name),
                interests = excluded.interests,
                budget = excluded.budget,
                schedule = excluded.schedule,
                travel_style = excluded.travel_style,
                dietary = excluded.dietary,
                accessibility = excluded.accessibility,
                notes = excluded.notes
            "#,
        )
        .bind(&group_id)
        .bind(user_id)
        .bind(display_name)
        .bind(&prefs.interests)
        .bind(&prefs.budget)
        .bind(&prefs.schedule)
        .bind(&prefs.travel_style)
        .bind(&prefs.dietary)
        .bind(&prefs.accessibility)
        .bind(&prefs.notes)
        .bind(&joined_at)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await
}

pub async fn load_member(pool: &SqlitePool, group_id: Uuid, user_id: &str) -> Result<Option<GroupMember>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM group_members WHERE group_id = ? AND user_id = ?",
        MEMBER_COLUMNS
    ))
    .bind(group_id.to_string())
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| member_from_row(&row)).transpose()
}

/// All members of a group in join order
pub async fn load_members(pool: &SqlitePool, group_id: Uuid) -> Result<Vec<GroupMember>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM group_members WHERE group_id = ? ORDER BY joined_at, user_id",
        MEMBER_COLUMNS
    ))
    .bind(group_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(member_from_row).collect()
}

fn member_from_row(row: &SqliteRow) -> Result<GroupMember> {
    let group_id: String = row.try_get("group_id")?;
    let group_id = Uuid::parse_str(&group_id)
        .map_err(|e| Error::Internal(format!("Invalid group_id '{}': {}", group_id, e)))?;

    let place_votes: String = row.try_get("place_votes")?;
    let place_votes: BTreeMap<String, PlaceVote> = serde_json::from_str(&place_votes)
        .map_err(|e| Error::Internal(format!("Failed to deserialize place_votes: {}", e)))?;

    let joined_at: String = row.try_get("joined_at")?;

    Ok(GroupMember {
        group_id,
        user_id: row.try_get("user_id")?,
        display_name: row.try_get("display_name")?,
        preferences: MemberPreferences {
            interests: row.try_get("interests")?,
            budget: row.try_get("budget")?,
            schedule: row.try_get("schedule")?,
            travel_style: row.try_get("travel_style")?,
            dietary: row.try_get("dietary")?,
            accessibility: row.try_get("accessibility")?,
            notes: row.try_get("notes")?,
        },
        regenerate_vote: row.try_get("regenerate_vote")?,
        itinerary_feedback: row.try_get("itinerary_feedback")?,
        selected_hotel: row.try_get("selected_hotel")?,
        place_votes,
        all_places_voted: row.try_get("all_places_voted")?,
        joined_at: parse_db_timestamp(&joined_at)?,
    })
}

/// Record a regenerate vote; feedback overwrites any earlier feedback
pub async fn set_regenerate_vote(
    pool: &SqlitePool,
    group_id: Uuid,
    user_id: &str,
    feedback: Option<&str>,
) -> Result<bool> {
    let group_id = group_id.to_string();
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("set_regenerate_vote", max_wait_ms, || async {
        let result = sqlx::query(
            "UPDATE group_members SET regenerate_vote = 1, itinerary_feedback = ?
             WHERE group_id = ? AND user_id = ?",
        )
        .bind(feedback)
        .bind(&group_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    })
    .await
}

/// Clear every member's vote and feedback in one statement
pub async fn reset_regenerate_votes(pool: &SqlitePool, group_id: Uuid) -> Result<u64> {
    let group_id = group_id.to_string();
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("reset_regenerate_votes", max_wait_ms, || async {
        let result = sqlx::query(
            "UPDATE group_members SET regenerate_vote = 0, itinerary_feedback = NULL
             WHERE group_id = ?",
        )
        .bind(&group_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    })
    .await
}

pub async fn set_selected_hotel(
    pool: &SqlitePool,
    group_id: Uuid,
    user_id: &str,
    hotel_id: Option<&str>,
) -> Result<bool> {
    let group_id = group_id.to_string();
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("set_selected_hotel", max_wait_ms, || async {
        let result = sqlx::query(
            "UPDATE group_members SET selected_hotel = ? WHERE group_id = ? AND user_id = ?",
        )
        .bind(hotel_id)
        .bind(&group_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    })
    .await
}

pub async fn set_place_votes(
    pool: &SqlitePool,
    group_id: Uuid,
    user_id: &str,
    place_votes: &BTreeMap<String, PlaceVote>,
    all_places_voted: bool,
) -> Result<bool> {
    let group_id = group_id.to_string();
    let place_votes = serialize_place_votes(place_votes)?;
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("set_place_votes", max_wait_ms, || async {
        let result = sqlx::query(
            "UPDATE group_members SET place_votes = ?, all_places_voted = ?
             WHERE group_id = ? AND user_id = ?",
        )
        .bind(&place_votes)
        .bind(all_places_voted)
        .bind(&group_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    })
    .await
}

pub async fn delete_member(pool: &SqlitePool, group_id: Uuid, user_id: &str) -> Result<bool> {
    let group_id = group_id.to_string();
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("delete_member", max_wait_ms, || async {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(&group_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    })
    .await
}

pub async fn count_members(pool: &SqlitePool, group_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = ?")
        .bind(group_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn serialize_place_votes(place_votes: &BTreeMap<String, PlaceVote>) -> Result<String> {
    serde_json::to_string(place_votes)
        .map_err(|e| Error::Internal(format!("Failed to serialize place_votes: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::groups;
    use crate::models::TravelGroup;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (SqlitePool, Uuid) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        wayfare_common::db::create_schema(&pool).await.unwrap();

        let group = TravelGroup::new("Goa, India".to_string(), "Goa".to_string(), "host".to_string(), 2);
        let host = GroupMember::new(group.group_id, "host", None, Default::default());
        groups::insert_group(&pool, &group, &host).await.unwrap();
        (pool, group.group_id)
    }

    #[tokio::test]
    async fn test_upsert_keeps_votes_of_existing_member() {
        let (pool, group_id) = setup().await;

        set_regenerate_vote(&pool, group_id, "host", Some("more beaches")).await.unwrap();

        let prefs = MemberPreferences {
            interests: Some("seafood".to_string()),
            ..Default::default()
        };
        upsert_member(&pool, group_id, "host", Some("Asha"), &prefs).await.unwrap();

        let member = load_member(&pool, group_id, "host").await.unwrap().unwrap();
        assert_eq!(member.display_name.as_deref(), Some("Asha"));
        assert_eq!(member.preferences.interests.as_deref(), Some("seafood"));
        assert!(member.regenerate_vote);
        assert_eq!(member.itinerary_feedback.as_deref(), Some("more beaches"));
    }

    #[tokio::test]
    async fn test_feedback_is_last_write_wins() {
        let (pool, group_id) = setup().await;

        set_regenerate_vote(&pool, group_id, "host", Some("first")).await.unwrap();
        set_regenerate_vote(&pool, group_id, "host", Some("second")).await.unwrap();

        let member = load_member(&pool, group_id, "host").await.unwrap().unwrap();
        assert_eq!(member.itinerary_feedback.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_reset_clears_all_members() {
        let (pool, group_id) = setup().await;
        upsert_member(&pool, group_id, "guest", None, &Default::default()).await.unwrap();

        set_regenerate_vote(&pool, group_id, "host", Some("a")).await.unwrap();
        set_regenerate_vote(&pool, group_id, "guest", None).await.unwrap();

        assert_eq!(reset_regenerate_votes(&pool, group_id).await.unwrap(), 2);

        for member in load_members(&pool, group_id).await.unwrap() {
            assert!(!member.regenerate_vote);
            assert!(member.itinerary_feedback.is_none());
        }
    }

    #[tokio::test]
    async fn test_place_votes_round_trip() {
        let (pool, group_id) = setup().await;
        let votes = BTreeMap::from([
            ("place-0-0".to_string(), PlaceVote::Accept),
            ("place-0-1".to_string(), PlaceVote::Reject),
        ]);

        assert!(set_place_votes(&pool, group_id, "host", &votes, true).await.unwrap());

        let member = load_member(&pool, group_id, "host").await.unwrap().unwrap();
        assert_eq!(member.place_votes, votes);
        assert!(member.all_places_voted);
    }

    #[tokio::test]
    async fn test_updates_on_missing_member_report_false() {
        let (pool, group_id) = setup().await;
        assert!(!set_selected_hotel(&pool, group_id, "ghost", Some("hotel-0")).await.unwrap());
        assert!(!set_regenerate_vote(&pool, group_id, "ghost", None).await.unwrap());
        assert!(!delete_member(&pool, group_id, "ghost").await.unwrap());
    }
}
