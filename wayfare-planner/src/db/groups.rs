//! Travel group persistence
//!
//! Every write touches only the columns owned by the calling operation, and
//! itinerary writes are conditional on `itinerary_version` (or on the
//! regeneration lease token) so concurrent writers never clobber each other.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use wayfare_common::time::{parse_db_date, parse_db_timestamp, to_db_timestamp};
use wayfare_common::{Error, ItineraryDocument, Result};

use super::members;
use super::settings::max_lock_wait_ms;
use crate::models::{GenerationRecord, GroupMember, ParsedFlight, TravelDates, TravelGroup};
use crate::utils::retry_on_lock;

const GROUP_COLUMNS: &str = r#"
    group_id, destination, destination_display, host_user_id, trip_duration_days,
    departure_date, return_date, departure_iata, destination_iata, cabin_class, adult_count,
    travel_dates_determined, booking_url, itinerary, itinerary_version,
    generation_prompt, generation_response, generated_at, selected_flight, final_hotel_id,
    created_at, updated_at
"#;

/// Insert a new group together with its host member in one transaction
pub async fn insert_group(pool: &SqlitePool, group: &TravelGroup, host: &GroupMember) -> Result<()> {
    let group_id = group.group_id.to_string();
    let created_at = to_db_timestamp(group.created_at);
    let updated_at = to_db_timestamp(group.updated_at);
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("insert_group", max_wait_ms, || async {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO travel_groups (
                group_id, destination, destination_display, host_user_id,
                trip_duration_days, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&group_id)
        .bind(&group.destination)
        .bind(&group.destination_display)
        .bind(&group.host_user_id)
        .bind(group.trip_duration_days as i64)
        .bind(&created_at)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await?;

        members::insert_member(&mut *tx, host).await?;

        tx.commit().await?;
        Ok(())
    })
    .await
}

/// Load one group, `None` when it does not exist
pub async fn load_group(pool: &SqlitePool, group_id: Uuid) -> Result<Option<TravelGroup>> {
    let row = sqlx::query(&format!("SELECT {} FROM travel_groups WHERE group_id = ?", GROUP_COLUMNS))
        .bind(group_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|row| group_from_row(&row)).transpose()
}

fn group_from_row(row: &SqliteRow) -> Result<TravelGroup> {
    let group_id: String = row.try_get("group_id")?;
    let group_id = Uuid::parse_str(&group_id)
        .map_err(|e| Error::Internal(format!("Invalid group_id '{}': {}", group_id, e)))?;

    let travel_dates = travel_dates_from_row(row)?;

    let itinerary: Option<String> = row.try_get("itinerary")?;
    let itinerary = itinerary
        .map(|json| serde_json::from_str::<ItineraryDocument>(&json))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize itinerary: {}", e)))?;

    let prompt: Option<String> = row.try_get("generation_prompt")?;
    let response: Option<String> = row.try_get("generation_response")?;
    let generated_at: Option<String> = row.try_get("generated_at")?;
    let last_generation = match (prompt, response, generated_at) {
        (Some(prompt), Some(response), Some(generated_at)) => Some(GenerationRecord {
            prompt,
            response,
            generated_at: parse_db_timestamp(&generated_at)?,
        }),
        _ => None,
    };

    let selected_flight: Option<String> = row.try_get("selected_flight")?;
    let selected_flight = selected_flight
        .map(|json| serde_json::from_str::<ParsedFlight>(&json))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize selected_flight: {}", e)))?;

    let trip_duration_days: i64 = row.try_get("trip_duration_days")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(TravelGroup {
        group_id,
        destination: row.try_get("destination")?,
        destination_display: row.try_get("destination_display")?,
        host_user_id: row.try_get("host_user_id")?,
        trip_duration_days: trip_duration_days.max(0) as u32,
        travel_dates,
        travel_dates_determined: row.try_get::<i64, _>("travel_dates_determined")? != 0,
        booking_url: row.try_get("booking_url")?,
        itinerary,
        itinerary_version: row.try_get("itinerary_version")?,
        last_generation,
        selected_flight,
        final_hotel_id: row.try_get("final_hotel_id")?,
        created_at: parse_db_timestamp(&created_at)?,
        updated_at: parse_db_timestamp(&updated_at)?,
    })
}

fn travel_dates_from_row(row: &SqliteRow) -> Result<Option<TravelDates>> {
    let departure_date: Option<String> = row.try_get("departure_date")?;
    let return_date: Option<String> = row.try_get("return_date")?;
    let departure_iata: Option<String> = row.try_get("departure_iata")?;
    let destination_iata: Option<String> = row.try_get("destination_iata")?;
    let cabin_class: Option<String> = row.try_get("cabin_class")?;
    let adult_count: Option<i64> = row.try_get("adult_count")?;

    let (Some(departure_date), Some(return_date), Some(departure_iata), Some(destination_iata)) =
        (departure_date, return_date, departure_iata, destination_iata)
    else {
        return Ok(None);
    };

    let cabin_class = match cabin_class {
        Some(value) => value.parse().map_err(Error::Internal)?,
        None => Default::default(),
    };

    Ok(Some(TravelDates {
        departure_date: parse_db_date(&departure_date)?,
        return_date: parse_db_date(&return_date)?,
        departure_iata,
        destination_iata,
        adult_count: adult_count.unwrap_or(1).max(0) as u32,
        cabin_class,
    }))
}

/// Store trip dates, booking parameters and URL in one UPDATE
///
/// Returns `false` when the group does not exist.
pub async fn update_travel_dates(
    pool: &SqlitePool,
    group_id: Uuid,
    dates: &TravelDates,
    booking_url: &str,
) -> Result<bool> {
    let group_id = group_id.to_string();
    let departure_date = dates.departure_date.format("%Y-%m-%d").to_string();
    let return_date = dates.return_date.format("%Y-%m-%d").to_string();
    let now = to_db_timestamp(Utc::now());
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("update_travel_dates", max_wait_ms, || async {
        let result = sqlx::query(
            r#"
            UPDATE travel_groups SET
                departure_date = ?, return_date = ?,
                departure_iata = ?, destination_iata = ?,
                cabin_class = ?, adult_count = ?,
                booking_url = ?, travel_dates_determined = 1,
                updated_at = ?
            WHERE group_id = ?
            "#,
        )
        .bind(&departure_date)
        .bind(&return_date)
        .bind(&dates.departure_iata)
        .bind(&dates.destination_iata)
        .bind(dates.cabin_class.as_str())
        .bind(dates.adult_count as i64)
        .bind(booking_url)
        .bind(&now)
        .bind(&group_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    })
    .await
}

pub async fn update_selected_flight(
    pool: &SqlitePool,
    group_id: Uuid,
    flight: &ParsedFlight,
) -> Result<bool> {
    let flight = serde_json::to_string(flight)
        .map_err(|e| Error::Internal(format!("Failed to serialize flight: {}", e)))?;
    update_column(pool, "update_selected_flight", group_id, "selected_flight", Some(flight)).await
}

/// Persist the hotel plurality winner (only `final_hotel_id`)
pub async fn set_final_hotel(pool: &SqlitePool, group_id: Uuid, hotel_id: &str) -> Result<bool> {
    update_column(pool, "set_final_hotel", group_id, "final_hotel_id", Some(hotel_id.to_string())).await
}

async fn update_column(
    pool: &SqlitePool,
    operation: &str,
    group_id: Uuid,
    column: &'static str,
    value: Option<String>,
) -> Result<bool> {
    let group_id = group_id.to_string();
    let now = to_db_timestamp(Utc::now());
    let sql = format!("UPDATE travel_groups SET {} = ?, updated_at = ? WHERE group_id = ?", column);
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock(operation, max_wait_ms, || async {
        let result = sqlx::query(&sql)
            .bind(&value)
            .bind(&now)
            .bind(&group_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    })
    .await
}

/// Condition an itinerary write is guarded by
#[derive(Debug, Clone, Copy)]
pub enum WriteGuard<'a> {
    /// Succeeds only if `itinerary_version` still equals the value read earlier
    Version(i64),
    /// Succeeds only while the caller holds the regeneration lease
    Lease(&'a str),
}

/// Write a new itinerary document, bumping `itinerary_version`
///
/// `generation` replaces the stored generation record when present. Returns the
/// new version, or `None` when the guard no longer holds (or the group is gone).
pub async fn save_itinerary(
    pool: &SqlitePool,
    group_id: Uuid,
    itinerary: &ItineraryDocument,
    guard: WriteGuard<'_>,
    generation: Option<&GenerationRecord>,
) -> Result<Option<i64>> {
    let group_id = group_id.to_string();
    let itinerary = serde_json::to_string(itinerary)
        .map_err(|e| Error::Internal(format!("Failed to serialize itinerary: {}", e)))?;
    let now = to_db_timestamp(Utc::now());
    let generated_at = generation.map(|g| to_db_timestamp(g.generated_at));

    let (guard_clause, version, token) = match guard {
        WriteGuard::Version(version) => ("itinerary_version = ?", Some(version), None),
        WriteGuard::Lease(token) => ("regeneration_token = ?", None, Some(token)),
    };
    let generation_clause = if generation.is_some() {
        "generation_prompt = ?, generation_response = ?, generated_at = ?,"
    } else {
        ""
    };
    let sql = format!(
        "UPDATE travel_groups SET itinerary = ?, itinerary_version = itinerary_version + 1, {} \
         updated_at = ? WHERE group_id = ? AND {} RETURNING itinerary_version",
        generation_clause, guard_clause
    );
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("save_itinerary", max_wait_ms, || async {
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(&itinerary);
        if let Some(record) = generation {
            query = query
                .bind(&record.prompt)
                .bind(&record.response)
                .bind(&generated_at);
        }
        query = query.bind(&now).bind(&group_id);
        query = match (version, token) {
            (Some(version), _) => query.bind(version),
            (None, token) => query.bind(token),
        };

        Ok(query.fetch_optional(pool).await?)
    })
    .await
}

/// Try to take the regeneration lease
///
/// Compare-and-set on `regeneration_token`: succeeds when no lease is held or
/// the held one started before `now - lease_secs`.
pub async fn claim_regeneration_lease(
    pool: &SqlitePool,
    group_id: Uuid,
    token: &str,
    lease_secs: i64,
) -> Result<bool> {
    let group_id = group_id.to_string();
    let now: DateTime<Utc> = Utc::now();
    let stale_cutoff = to_db_timestamp(now - chrono::Duration::seconds(lease_secs));
    let now = to_db_timestamp(now);
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("claim_regeneration_lease", max_wait_ms, || async {
        let result = sqlx::query(
            r#"
            UPDATE travel_groups
            SET regeneration_token = ?, regeneration_started_at = ?
            WHERE group_id = ?
              AND (regeneration_token IS NULL OR regeneration_started_at < ?)
            "#,
        )
        .bind(token)
        .bind(&now)
        .bind(&group_id)
        .bind(&stale_cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    })
    .await
}

/// Release the lease if `token` still holds it
pub async fn release_regeneration_lease(pool: &SqlitePool, group_id: Uuid, token: &str) -> Result<()> {
    let group_id = group_id.to_string();
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("release_regeneration_lease", max_wait_ms, || async {
        sqlx::query(
            r#"
            UPDATE travel_groups
            SET regeneration_token = NULL, regeneration_started_at = NULL
            WHERE group_id = ? AND regeneration_token = ?
            "#,
        )
        .bind(&group_id)
        .bind(token)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await
}

/// Delete a group; members go with it via `ON DELETE CASCADE`
pub async fn delete_group(pool: &SqlitePool, group_id: Uuid) -> Result<bool> {
    let group_id = group_id.to_string();
    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("delete_group", max_wait_ms, || async {
        let result = sqlx::query("DELETE FROM travel_groups WHERE group_id = ?")
            .bind(&group_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CabinClass;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;
    use wayfare_common::itinerary::{Day, Place};

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        wayfare_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    async fn seed_group(pool: &SqlitePool) -> TravelGroup {
        let group = TravelGroup::new(
            "Leh, Ladakh, India".to_string(),
            "Leh".to_string(),
            "host".to_string(),
            3,
        );
        let host = GroupMember::new(group.group_id, "host", Some("Host".to_string()), Default::default());
        insert_group(pool, &group, &host).await.unwrap();
        group
    }

    fn one_day_itinerary(name: &str) -> ItineraryDocument {
        ItineraryDocument {
            days: vec![Day {
                places: vec![Place {
                    id: "place-0-0".to_string(),
                    name: name.to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let pool = setup_test_db().await;
        let group = seed_group(&pool).await;

        let loaded = load_group(&pool, group.group_id).await.unwrap().unwrap();
        assert_eq!(loaded.destination, "Leh, Ladakh, India");
        assert_eq!(loaded.trip_duration_days, 3);
        assert!(!loaded.travel_dates_determined);
        assert!(loaded.itinerary.is_none());
        assert_eq!(loaded.itinerary_version, 0);

        let members = members::load_members(&pool, group.group_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, "host");
    }

    #[tokio::test]
    async fn test_load_missing_group_is_none() {
        let pool = setup_test_db().await;
        assert!(load_group(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_travel_dates_sets_flag_and_url() {
        let pool = setup_test_db().await;
        let group = seed_group(&pool).await;

        let dates = TravelDates {
            departure_date: NaiveDate::from_ymd_opt(2025, 7, 26).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2025, 8, 2).unwrap(),
            departure_iata: "MAA".to_string(),
            destination_iata: "IXL".to_string(),
            adult_count: 2,
            cabin_class: CabinClass::Business,
        };
        assert!(update_travel_dates(&pool, group.group_id, &dates, "https://example.test/x")
            .await
            .unwrap());

        let loaded = load_group(&pool, group.group_id).await.unwrap().unwrap();
        assert!(loaded.travel_dates_determined);
        assert_eq!(loaded.booking_url.as_deref(), Some("https://example.test/x"));
        assert_eq!(loaded.travel_dates, Some(dates));
    }

    #[tokio::test]
    async fn test_versioned_save_rejects_stale_version() {
        let pool = setup_test_db().await;
        let group = seed_group(&pool).await;

        let v1 = save_itinerary(&pool, group.group_id, &one_day_itinerary("A"), WriteGuard::Version(0), None)
            .await
            .unwrap();
        assert_eq!(v1, Some(1));

        let stale = save_itinerary(&pool, group.group_id, &one_day_itinerary("B"), WriteGuard::Version(0), None)
            .await
            .unwrap();
        assert_eq!(stale, None);

        let loaded = load_group(&pool, group.group_id).await.unwrap().unwrap();
        assert_eq!(loaded.itinerary.unwrap().days[0].places[0].name, "A");
    }

    #[tokio::test]
    async fn test_save_with_generation_record() {
        let pool = setup_test_db().await;
        let group = seed_group(&pool).await;
        let record = GenerationRecord {
            prompt: "plan".to_string(),
            response: "{}".to_string(),
            generated_at: Utc::now(),
        };

        save_itinerary(&pool, group.group_id, &one_day_itinerary("A"), WriteGuard::Version(0), Some(&record))
            .await
            .unwrap();

        let loaded = load_group(&pool, group.group_id).await.unwrap().unwrap();
        let stored = loaded.last_generation.unwrap();
        assert_eq!(stored.prompt, "plan");
        assert_eq!(stored.response, "{}");
    }

    #[tokio::test]
    async fn test_lease_is_exclusive_until_released() {
        let pool = setup_test_db().await;
        let group = seed_group(&pool).await;

        assert!(claim_regeneration_lease(&pool, group.group_id, "first", 600).await.unwrap());
        assert!(!claim_regeneration_lease(&pool, group.group_id, "second", 600).await.unwrap());

        // Only the holder can write under the lease
        let by_other = save_itinerary(&pool, group.group_id, &one_day_itinerary("X"), WriteGuard::Lease("second"), None)
            .await
            .unwrap();
        assert_eq!(by_other, None);
        let by_holder = save_itinerary(&pool, group.group_id, &one_day_itinerary("X"), WriteGuard::Lease("first"), None)
            .await
            .unwrap();
        assert_eq!(by_holder, Some(1));

        // Releasing with the wrong token is a no-op
        release_regeneration_lease(&pool, group.group_id, "second").await.unwrap();
        assert!(!claim_regeneration_lease(&pool, group.group_id, "second", 600).await.unwrap());

        release_regeneration_lease(&pool, group.group_id, "first").await.unwrap();
        assert!(claim_regeneration_lease(&pool, group.group_id, "second", 600).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_lease_can_be_taken_over() {
        let pool = setup_test_db().await;
        let group = seed_group(&pool).await;

        assert!(claim_regeneration_lease(&pool, group.group_id, "crashed", 600).await.unwrap());
        sqlx::query("UPDATE travel_groups SET regeneration_started_at = ?")
            .bind(to_db_timestamp(Utc::now() - chrono::Duration::hours(1)))
            .execute(&pool)
            .await
            .unwrap();

        assert!(claim_regeneration_lease(&pool, group.group_id, "rescuer", 600).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_group_cascades_members() {
        let pool = setup_test_db().await;
        let group = seed_group(&pool).await;

        assert!(delete_group(&pool, group.group_id).await.unwrap());
        assert_eq!(members::count_members(&pool, group.group_id).await.unwrap(), 0);
        assert!(!delete_group(&pool, group.group_id).await.unwrap());
    }
}
