//! Pipeline orchestrator
//!
//! Each operation reads the rows it needs, runs the pure computation, calls
//! providers where applicable and persists with a single update limited to the
//! columns it owns. Input is validated before any provider call.
//!
//! Itinerary writes are optimistic on `itinerary_version`. Regeneration is
//! fenced by a lease token on the group row so that only one of several racing
//! majority-crossing votes regenerates; votes are reset only after the new
//! document has been stored.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;
use wayfare_common::events::{EventBus, WayfareEvent};
use wayfare_common::itinerary::Day;
use wayfare_common::ItineraryDocument;

use crate::config::ProviderSettings;
use crate::db::groups::{self, WriteGuard};
use crate::db::{members, settings};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    GenerationRecord, GroupMember, MemberPreferences, ParsedFlight, PlaceVote, TravelDates,
    TravelGroup,
};
use crate::providers::{with_timeout, Providers};
use crate::services::booking_url::booking_url_for;
use crate::services::consensus::{
    self, HotelVoteOutcome, PlaceVoteSummary, RegenerationTally,
};
use crate::services::enrichment::{EnrichmentPipeline, EnrichmentReport};
use crate::services::flight_parser::parse_flight_options;
use crate::services::itinerary_json::parse_itinerary_response;
use crate::services::prompts;

const MAX_TRIP_DAYS: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupRequest {
    pub destination: String,
    /// Defaults to the first comma-separated segment of `destination`
    #[serde(default)]
    pub destination_display: Option<String>,
    pub host_user_id: String,
    #[serde(default)]
    pub host_display_name: Option<String>,
    pub trip_duration_days: u32,
    #[serde(default)]
    pub preferences: MemberPreferences,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinGroupRequest {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub preferences: MemberPreferences,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveOutcome {
    pub group_dissolved: bool,
    pub remaining_members: i64,
}

/// Flight search result; `NotReady` until travel dates are determined
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlightOptions {
    NotReady { reason: String },
    Ready { flights: Vec<ParsedFlight> },
}

#[derive(Debug, Clone, Serialize)]
pub struct DayEnrichment {
    pub day_index: usize,
    pub itinerary_version: i64,
    pub day: Day,
    pub report: EnrichmentReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationStatus {
    /// Threshold not reached yet
    Collecting,
    /// This vote triggered a regeneration that completed
    Regenerated,
    /// Another request holds the regeneration lease
    InProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenerateVoteOutcome {
    pub triggered: bool,
    pub votes: usize,
    pub total: usize,
    pub threshold: usize,
    pub status: RegenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary_version: Option<i64>,
}

impl RegenerateVoteOutcome {
    fn new(tally: RegenerationTally, status: RegenerationStatus, itinerary_version: Option<i64>) -> Self {
        Self {
            triggered: status == RegenerationStatus::Regenerated,
            votes: tally.votes,
            total: tally.total,
            threshold: tally.threshold,
            status,
            itinerary_version,
        }
    }
}

#[derive(Clone)]
pub struct PipelineOrchestrator {
    db: SqlitePool,
    providers: Providers,
    enrichment: EnrichmentPipeline,
    event_bus: EventBus,
    generation_timeout: Duration,
}

impl PipelineOrchestrator {
    pub fn new(db: SqlitePool, providers: Providers, event_bus: EventBus, settings: &ProviderSettings) -> Self {
        let enrichment = EnrichmentPipeline::new(
            providers.clone(),
            settings.call_timeout,
            settings.default_image_url.clone(),
        );
        Self {
            db,
            providers,
            enrichment,
            event_bus,
            generation_timeout: settings.generation_timeout,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // ------------------------------------------------------------------
    // Groups and members
    // ------------------------------------------------------------------

    pub async fn create_group(&self, request: CreateGroupRequest) -> PipelineResult<TravelGroup> {
        let destination = required("destination", &request.destination)?;
        let host_user_id = required("host_user_id", &request.host_user_id)?;
        if request.trip_duration_days == 0 || request.trip_duration_days > MAX_TRIP_DAYS {
            return Err(PipelineError::InvalidInput(format!(
                "trip_duration_days must be between 1 and {}",
                MAX_TRIP_DAYS
            )));
        }

        let display = request
            .destination_display
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| destination.split(',').next().unwrap_or(destination).trim())
            .to_string();

        let group = TravelGroup::new(
            destination.to_string(),
            display,
            host_user_id.to_string(),
            request.trip_duration_days,
        );
        let host = GroupMember::new(
            group.group_id,
            host_user_id,
            request.host_display_name,
            request.preferences,
        );
        groups::insert_group(&self.db, &group, &host).await?;

        info!(group_id = %group.group_id, destination = %group.destination, "Travel group created");
        self.event_bus.emit_lossy(WayfareEvent::GroupCreated {
            group_id: group.group_id,
            destination: group.destination.clone(),
            timestamp: Utc::now(),
        });
        Ok(group)
    }

    pub async fn get_group(&self, group_id: Uuid) -> PipelineResult<TravelGroup> {
        self.require_group(group_id).await
    }

    pub async fn list_members(&self, group_id: Uuid) -> PipelineResult<Vec<GroupMember>> {
        self.require_group(group_id).await?;
        Ok(members::load_members(&self.db, group_id).await?)
    }

    pub async fn join_group(&self, group_id: Uuid, request: JoinGroupRequest) -> PipelineResult<GroupMember> {
        let user_id = required("user_id", &request.user_id)?;
        self.require_group(group_id).await?;

        members::upsert_member(
            &self.db,
            group_id,
            user_id,
            request.display_name.as_deref(),
            &request.preferences,
        )
        .await?;
        let member = self.require_member(group_id, user_id).await?;

        info!(group_id = %group_id, user_id, "Member joined");
        self.event_bus.emit_lossy(WayfareEvent::MemberJoined {
            group_id,
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
        });
        Ok(member)
    }

    pub async fn update_preferences(
        &self,
        group_id: Uuid,
        user_id: &str,
        preferences: MemberPreferences,
    ) -> PipelineResult<GroupMember> {
        self.require_group(group_id).await?;
        self.require_member(group_id, user_id).await?;

        members::upsert_member(&self.db, group_id, user_id, None, &preferences).await?;
        self.require_member(group_id, user_id).await
    }

    /// Remove a member; the group is deleted with its last member
    pub async fn leave_group(&self, group_id: Uuid, user_id: &str) -> PipelineResult<LeaveOutcome> {
        self.require_group(group_id).await?;

        if !members::delete_member(&self.db, group_id, user_id).await? {
            return Err(member_not_found(group_id, user_id));
        }
        self.event_bus.emit_lossy(WayfareEvent::MemberLeft {
            group_id,
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
        });

        let remaining_members = members::count_members(&self.db, group_id).await?;
        let group_dissolved = remaining_members == 0 && groups::delete_group(&self.db, group_id).await?;
        if group_dissolved {
            info!(group_id = %group_id, "Last member left, group dissolved");
            self.event_bus.emit_lossy(WayfareEvent::GroupDissolved {
                group_id,
                timestamp: Utc::now(),
            });
        }

        Ok(LeaveOutcome {
            group_dissolved,
            remaining_members,
        })
    }

    // ------------------------------------------------------------------
    // Dates and flights
    // ------------------------------------------------------------------

    /// Fix travel dates and generate the booking URL in one update
    pub async fn determine_travel_dates(&self, group_id: Uuid, dates: TravelDates) -> PipelineResult<TravelGroup> {
        let dates = TravelDates {
            departure_iata: dates.departure_iata.trim().to_ascii_uppercase(),
            destination_iata: dates.destination_iata.trim().to_ascii_uppercase(),
            ..dates
        };
        let booking_url =
            booking_url_for(&dates).map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        self.require_group(group_id).await?;
        if !groups::update_travel_dates(&self.db, group_id, &dates, &booking_url).await? {
            return Err(PipelineError::GroupNotFound(group_id));
        }

        info!(group_id = %group_id, %booking_url, "Travel dates determined");
        self.event_bus.emit_lossy(WayfareEvent::TravelDatesDetermined {
            group_id,
            booking_url,
            timestamp: Utc::now(),
        });
        self.require_group(group_id).await
    }

    /// Scrape and parse flight offers for the group's booking URL
    pub async fn fetch_flight_options(&self, group_id: Uuid) -> PipelineResult<FlightOptions> {
        let group = self.require_group(group_id).await?;

        let booking_url = match (&group.booking_url, group.travel_dates_determined) {
            (Some(url), true) => url.clone(),
            _ => {
                return Ok(FlightOptions::NotReady {
                    reason: "travel dates have not been determined".to_string(),
                })
            }
        };

        let offers = with_timeout(
            "flight scraper",
            self.generation_timeout,
            self.providers.scraper.scrape(&booking_url),
        )
        .await
        .inspect_err(|e| error!(group_id = %group_id, error = %e, "Flight scraping failed"))?;

        let flights = parse_flight_options(&offers);
        info!(group_id = %group_id, offers = offers.len(), "Flight options parsed");
        self.event_bus.emit_lossy(WayfareEvent::FlightOptionsParsed {
            group_id,
            offer_count: offers.len(),
            timestamp: Utc::now(),
        });
        Ok(FlightOptions::Ready { flights })
    }

    pub async fn select_flight(&self, group_id: Uuid, flight: ParsedFlight) -> PipelineResult<TravelGroup> {
        self.require_group(group_id).await?;
        if !groups::update_selected_flight(&self.db, group_id, &flight).await? {
            return Err(PipelineError::GroupNotFound(group_id));
        }
        self.require_group(group_id).await
    }

    // ------------------------------------------------------------------
    // Itinerary
    // ------------------------------------------------------------------

    /// Generate and store a new itinerary from member preferences
    ///
    /// The document is stored unenriched; enrichment is paginated through
    /// [`Self::enrich_day`].
    pub async fn generate_itinerary(&self, group_id: Uuid) -> PipelineResult<ItineraryDocument> {
        let group = self.require_group(group_id).await?;
        let members = members::load_members(&self.db, group_id).await?;

        let prompt = prompts::generation_prompt(&group, &members);
        let (document, record) = self.generate(prompt).await.inspect_err(|e| {
            error!(group_id = %group_id, error = %e, "Itinerary generation failed");
        })?;

        let version = groups::save_itinerary(
            &self.db,
            group_id,
            &document,
            WriteGuard::Version(group.itinerary_version),
            Some(&record),
        )
        .await?
        .ok_or_else(|| PipelineError::Conflict("itinerary changed during generation".to_string()))?;

        info!(group_id = %group_id, itinerary_version = version, days = document.days.len(), "Itinerary generated");
        self.event_bus.emit_lossy(WayfareEvent::ItineraryGenerated {
            group_id,
            itinerary_version: version,
            day_count: document.days.len(),
            timestamp: Utc::now(),
        });
        Ok(document)
    }

    /// Enrich one day of the stored itinerary
    ///
    /// If another write bumped the version meanwhile, the enriched day is
    /// re-applied once onto the fresh document provided it still lists the same
    /// places; otherwise the operation fails with a conflict.
    pub async fn enrich_day(&self, group_id: Uuid, day_index: usize) -> PipelineResult<DayEnrichment> {
        let group = self.require_group(group_id).await?;
        let mut document = require_itinerary(&group)?;

        let report = self
            .enrichment
            .enrich_day(&mut document, day_index, &group.destination)
            .await?;
        let enriched_day = document.days[day_index].clone();

        let version = match groups::save_itinerary(
            &self.db,
            group_id,
            &document,
            WriteGuard::Version(group.itinerary_version),
            None,
        )
        .await?
        {
            Some(version) => version,
            None => self.reapply_day(group_id, day_index, &enriched_day).await?,
        };

        self.event_bus.emit_lossy(WayfareEvent::DayEnriched {
            group_id,
            day_index,
            photos_fetched: report.photos_fetched,
            photos_defaulted: report.photos_defaulted,
            hops_routed: report.hops_routed,
            timestamp: Utc::now(),
        });
        Ok(DayEnrichment {
            day_index,
            itinerary_version: version,
            day: enriched_day,
            report,
        })
    }

    async fn reapply_day(&self, group_id: Uuid, day_index: usize, enriched_day: &Day) -> PipelineResult<i64> {
        let conflict = || PipelineError::Conflict(format!("itinerary changed while enriching day {}", day_index));

        let fresh = self.require_group(group_id).await?;
        let mut document = fresh.itinerary.ok_or_else(conflict)?;
        match document.days.get_mut(day_index) {
            Some(day) if day.same_places(enriched_day) => *day = enriched_day.clone(),
            _ => {
                warn!(group_id = %group_id, day_index, "Itinerary regenerated during enrichment");
                return Err(conflict());
            }
        }
        document.recompute_map_locations();

        groups::save_itinerary(
            &self.db,
            group_id,
            &document,
            WriteGuard::Version(fresh.itinerary_version),
            None,
        )
        .await?
        .ok_or_else(conflict)
    }

    /// Enrich every day and hotel of the stored itinerary
    pub async fn enrich_all(&self, group_id: Uuid) -> PipelineResult<ItineraryDocument> {
        let group = self.require_group(group_id).await?;
        let mut document = require_itinerary(&group)?;

        self.enrichment.enrich_all(&mut document, &group.destination).await;

        groups::save_itinerary(
            &self.db,
            group_id,
            &document,
            WriteGuard::Version(group.itinerary_version),
            None,
        )
        .await?
        .ok_or_else(|| PipelineError::Conflict("itinerary changed during enrichment".to_string()))?;

        Ok(document)
    }

    // ------------------------------------------------------------------
    // Regenerate vote
    // ------------------------------------------------------------------

    /// Record a regenerate vote and regenerate once the majority is reached
    pub async fn cast_regenerate_vote(
        &self,
        group_id: Uuid,
        user_id: &str,
        feedback: Option<String>,
    ) -> PipelineResult<RegenerateVoteOutcome> {
        self.require_group(group_id).await?;
        let feedback = feedback
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty());

        if !members::set_regenerate_vote(&self.db, group_id, user_id, feedback).await? {
            return Err(member_not_found(group_id, user_id));
        }

        let tally = consensus::tally_regenerate_votes(&members::load_members(&self.db, group_id).await?);
        info!(
            group_id = %group_id,
            user_id,
            votes = tally.votes,
            total = tally.total,
            threshold = tally.threshold,
            "Regenerate vote cast"
        );
        self.event_bus.emit_lossy(WayfareEvent::RegenerateVoteCast {
            group_id,
            user_id: user_id.to_string(),
            votes: tally.votes,
            total: tally.total,
            threshold: tally.threshold,
            timestamp: Utc::now(),
        });

        if !tally.is_reached() {
            return Ok(RegenerateVoteOutcome::new(tally, RegenerationStatus::Collecting, None));
        }

        // Runs to completion (lease release included) even if the caller is dropped
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run_regeneration(group_id, tally).await })
            .await
            .map_err(|e| {
                error!(group_id = %group_id, error = %e, "Regeneration task aborted");
                PipelineError::Generation(format!("regeneration task failed: {}", e))
            })?
    }

    /// Claim the lease, regenerate and always release
    async fn run_regeneration(
        &self,
        group_id: Uuid,
        tally: RegenerationTally,
    ) -> PipelineResult<RegenerateVoteOutcome> {
        let token = Uuid::new_v4().to_string();
        let lease_secs = settings::regeneration_lease_secs(&self.db).await?;
        if !groups::claim_regeneration_lease(&self.db, group_id, &token, lease_secs).await? {
            info!(group_id = %group_id, "Regeneration already in progress");
            return Ok(RegenerateVoteOutcome::new(tally, RegenerationStatus::InProgress, None));
        }

        let result = self.regenerate_under_lease(group_id, &token).await;

        if let Err(e) = groups::release_regeneration_lease(&self.db, group_id, &token).await {
            error!(group_id = %group_id, error = %e, "Failed to release regeneration lease");
        }

        match result {
            Ok((tally, Some(version))) => Ok(RegenerateVoteOutcome::new(
                tally,
                RegenerationStatus::Regenerated,
                Some(version),
            )),
            Ok((tally, None)) => Ok(RegenerateVoteOutcome::new(tally, RegenerationStatus::Collecting, None)),
            Err(e) => {
                error!(group_id = %group_id, error = %e, "Regeneration failed, votes kept");
                self.event_bus.emit_lossy(WayfareEvent::RegenerationFailed {
                    group_id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// Regenerate while holding the lease
    ///
    /// Re-checks the threshold against fresh rows first; `None` version means
    /// the majority no longer holds and nothing was done.
    async fn regenerate_under_lease(
        &self,
        group_id: Uuid,
        token: &str,
    ) -> PipelineResult<(RegenerationTally, Option<i64>)> {
        let group = self.require_group(group_id).await?;
        let members = members::load_members(&self.db, group_id).await?;
        let tally = consensus::tally_regenerate_votes(&members);
        if !tally.is_reached() {
            info!(group_id = %group_id, votes = tally.votes, "Majority no longer holds, skipping regeneration");
            return Ok((tally, None));
        }

        self.event_bus.emit_lossy(WayfareEvent::RegenerationStarted {
            group_id,
            timestamp: Utc::now(),
        });

        let feedback = consensus::collect_feedback(&members);
        let previous_places: Vec<&str> = group
            .itinerary
            .iter()
            .flat_map(|doc| doc.days.iter())
            .flat_map(|day| day.places.iter().map(|p| p.name.as_str()))
            .collect();
        let prompt = prompts::regeneration_prompt(&group, &members, &feedback, &previous_places);

        let (mut document, record) = self.generate(prompt).await?;
        self.enrichment.enrich_all(&mut document, &group.destination).await;

        let version = groups::save_itinerary(&self.db, group_id, &document, WriteGuard::Lease(token), Some(&record))
            .await?
            .ok_or_else(|| PipelineError::Conflict("regeneration lease lost".to_string()))?;

        // Only after the new document is stored
        let reset = members::reset_regenerate_votes(&self.db, group_id).await?;

        info!(group_id = %group_id, itinerary_version = version, votes_reset = reset, "Itinerary regenerated");
        self.event_bus.emit_lossy(WayfareEvent::RegenerationCompleted {
            group_id,
            itinerary_version: version,
            timestamp: Utc::now(),
        });
        Ok((tally, Some(version)))
    }

    async fn generate(&self, prompt: String) -> PipelineResult<(ItineraryDocument, GenerationRecord)> {
        let response = with_timeout(
            "text generation",
            self.generation_timeout,
            self.providers.generator.generate(&prompt),
        )
        .await?;

        let document = parse_itinerary_response(&response)?;
        Ok((
            document,
            GenerationRecord {
                prompt,
                response,
                generated_at: Utc::now(),
            },
        ))
    }

    // ------------------------------------------------------------------
    // Hotel and place votes
    // ------------------------------------------------------------------

    /// Set or clear a member's hotel choice
    pub async fn select_hotel(
        &self,
        group_id: Uuid,
        user_id: &str,
        hotel_id: Option<String>,
    ) -> PipelineResult<GroupMember> {
        let group = self.require_group(group_id).await?;

        if let Some(hotel_id) = &hotel_id {
            let itinerary = require_itinerary(&group)?;
            if itinerary.hotel(hotel_id).is_none() {
                return Err(PipelineError::InvalidInput(format!(
                    "hotel '{}' is not part of the itinerary",
                    hotel_id
                )));
            }
        }

        if !members::set_selected_hotel(&self.db, group_id, user_id, hotel_id.as_deref()).await? {
            return Err(member_not_found(group_id, user_id));
        }
        self.require_member(group_id, user_id).await
    }

    /// Tally hotel selections and store the winner
    pub async fn aggregate_hotel_vote(&self, group_id: Uuid) -> PipelineResult<HotelVoteOutcome> {
        let group = self.require_group(group_id).await?;
        let members = members::load_members(&self.db, group_id).await?;

        let hotels = group.itinerary.as_ref().map(|doc| doc.hotels.as_slice()).unwrap_or_default();
        let outcome = consensus::tally_hotel_votes(
            hotels,
            members.iter().map(|m| m.selected_hotel.as_deref()),
        );

        if let Some(winner) = &outcome.winner_hotel_id {
            groups::set_final_hotel(&self.db, group_id, winner).await?;
            info!(group_id = %group_id, hotel_id = %winner, rule = ?outcome.rule, "Hotel winner selected");
            self.event_bus.emit_lossy(WayfareEvent::HotelWinnerSelected {
                group_id,
                hotel_id: winner.clone(),
                timestamp: Utc::now(),
            });
        }
        Ok(outcome)
    }

    /// Accept or reject one place; overwrites an earlier vote on that place
    pub async fn record_place_vote(
        &self,
        group_id: Uuid,
        user_id: &str,
        place_id: &str,
        vote: PlaceVote,
    ) -> PipelineResult<GroupMember> {
        let group = self.require_group(group_id).await?;
        let itinerary = require_itinerary(&group)?;
        if !itinerary.has_place(place_id) {
            return Err(PipelineError::InvalidInput(format!(
                "place '{}' is not part of the itinerary",
                place_id
            )));
        }

        let mut member = self.require_member(group_id, user_id).await?;
        member.place_votes.insert(place_id.to_string(), vote);
        member.all_places_voted = consensus::all_places_voted(&itinerary, &member.place_votes);

        if !members::set_place_votes(
            &self.db,
            group_id,
            user_id,
            &member.place_votes,
            member.all_places_voted,
        )
        .await?
        {
            return Err(member_not_found(group_id, user_id));
        }
        Ok(member)
    }

    pub async fn place_vote_summary(&self, group_id: Uuid) -> PipelineResult<Vec<PlaceVoteSummary>> {
        let group = self.require_group(group_id).await?;
        let itinerary = require_itinerary(&group)?;
        let members = members::load_members(&self.db, group_id).await?;
        Ok(consensus::summarize_place_votes(&itinerary, &members))
    }

    // ------------------------------------------------------------------

    async fn require_group(&self, group_id: Uuid) -> PipelineResult<TravelGroup> {
        groups::load_group(&self.db, group_id)
            .await?
            .ok_or(PipelineError::GroupNotFound(group_id))
    }

    async fn require_member(&self, group_id: Uuid, user_id: &str) -> PipelineResult<GroupMember> {
        members::load_member(&self.db, group_id, user_id)
            .await?
            .ok_or_else(|| member_not_found(group_id, user_id))
    }
}

fn require_itinerary(group: &TravelGroup) -> PipelineResult<ItineraryDocument> {
    group
        .itinerary
        .clone()
        .ok_or_else(|| PipelineError::NotReady("no itinerary has been generated yet".to_string()))
}

fn member_not_found(group_id: Uuid, user_id: &str) -> PipelineError {
    PipelineError::MemberNotFound {
        group_id,
        user_id: user_id.to_string(),
    }
}

fn required<'a>(field: &str, value: &'a str) -> PipelineResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(PipelineError::InvalidInput(format!("{} is required", field)))
    } else {
        Ok(value)
    }
}
