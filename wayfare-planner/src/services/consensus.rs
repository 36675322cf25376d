//! Group consensus rules
//!
//! Pure functions over member votes; the orchestrator feeds them rows and
//! persists the outcome.
//!
//! - Regenerate vote: majority of members, unanimity for two-person groups
//! - Hotel vote: plurality, ties broken by lowest price then hotel-list order
//! - Place votes: per-place accept/reject counts

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use wayfare_common::itinerary::Hotel;
use wayfare_common::ItineraryDocument;

use crate::models::{GroupMember, PlaceVote};

/// Votes needed to trigger regeneration in a group of `members`
///
/// Two-person groups need both votes; otherwise `ceil(n / 2)`.
pub fn majority_threshold(members: usize) -> usize {
    if members == 2 {
        2
    } else {
        members.div_ceil(2)
    }
}

/// Snapshot of the regenerate vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegenerationTally {
    pub votes: usize,
    pub total: usize,
    pub threshold: usize,
}

impl RegenerationTally {
    pub fn new(votes: usize, total: usize) -> Self {
        Self {
            votes,
            total,
            threshold: majority_threshold(total),
        }
    }

    /// An empty group never reaches the threshold
    pub fn is_reached(&self) -> bool {
        self.total > 0 && self.votes >= self.threshold
    }
}

pub fn tally_regenerate_votes(members: &[GroupMember]) -> RegenerationTally {
    let votes = members.iter().filter(|m| m.regenerate_vote).count();
    RegenerationTally::new(votes, members.len())
}

/// Feedback of members who voted to regenerate, labelled by member
pub fn collect_feedback(members: &[GroupMember]) -> Vec<(String, String)> {
    members
        .iter()
        .filter(|m| m.regenerate_vote)
        .filter_map(|m| {
            m.itinerary_feedback
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(|f| (m.label().to_string(), f.to_string()))
        })
        .collect()
}

/// Numeric value of a currency-prefixed price string
///
/// Every character other than ASCII digits and `.` is dropped before parsing,
/// so `"INR 4,500"` is 4500 and `"$149.99/night"` is 149.99. `None` when nothing
/// numeric remains.
pub fn parse_price(price: &str) -> Option<f64> {
    let digits: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// How the hotel winner was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WinnerRule {
    /// Single hotel with the most votes
    Plurality,
    /// Tie broken by strictly lowest price
    LowestPrice,
    /// Tie with no usable price difference, first in hotel-list order
    ListOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelTally {
    pub hotel_id: String,
    pub votes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelVoteOutcome {
    pub winner_hotel_id: Option<String>,
    pub rule: Option<WinnerRule>,
    /// Per-hotel counts in first-vote order
    pub tallies: Vec<HotelTally>,
}

/// Plurality vote over members' hotel selections
///
/// Selections for ids missing from `hotels` still count; they price as
/// +infinity and sort after listed hotels when tied.
pub fn tally_hotel_votes<'a>(
    hotels: &[Hotel],
    selections: impl IntoIterator<Item = Option<&'a str>>,
) -> HotelVoteOutcome {
    let mut tallies: Vec<HotelTally> = Vec::new();
    for hotel_id in selections.into_iter().flatten() {
        match tallies.iter_mut().find(|t| t.hotel_id == hotel_id) {
            Some(tally) => tally.votes += 1,
            None => tallies.push(HotelTally {
                hotel_id: hotel_id.to_string(),
                votes: 1,
            }),
        }
    }

    let Some(max_votes) = tallies.iter().map(|t| t.votes).max() else {
        return HotelVoteOutcome {
            winner_hotel_id: None,
            rule: None,
            tallies,
        };
    };

    // (price, list position, first-seen position, id)
    let mut tied: Vec<(f64, usize, usize, &str)> = tallies
        .iter()
        .enumerate()
        .filter(|(_, t)| t.votes == max_votes)
        .map(|(seen, t)| {
            let position = hotels.iter().position(|h| h.id == t.hotel_id);
            let price = position
                .and_then(|i| parse_price(&hotels[i].price))
                .unwrap_or(f64::INFINITY);
            (price, position.unwrap_or(usize::MAX), seen, t.hotel_id.as_str())
        })
        .collect();

    let rule = if tied.len() == 1 {
        WinnerRule::Plurality
    } else {
        tied.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });
        if tied[0].0.is_finite() && tied[0].0 < tied[1].0 {
            WinnerRule::LowestPrice
        } else {
            WinnerRule::ListOrder
        }
    };

    let winner = tied[0].3.to_string();
    HotelVoteOutcome {
        winner_hotel_id: Some(winner),
        rule: Some(rule),
        tallies,
    }
}

/// Accept/reject counts for one place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceVoteSummary {
    pub place_id: String,
    pub name: String,
    pub day_index: usize,
    pub accepts: usize,
    pub rejects: usize,
    /// Members who have not voted on this place
    pub pending: usize,
}

pub fn summarize_place_votes(
    itinerary: &ItineraryDocument,
    members: &[GroupMember],
) -> Vec<PlaceVoteSummary> {
    let mut summaries = Vec::new();
    for (day_index, day) in itinerary.days.iter().enumerate() {
        for place in &day.places {
            let mut accepts = 0;
            let mut rejects = 0;
            for member in members {
                match member.place_votes.get(&place.id) {
                    Some(PlaceVote::Accept) => accepts += 1,
                    Some(PlaceVote::Reject) => rejects += 1,
                    None => {}
                }
            }
            summaries.push(PlaceVoteSummary {
                place_id: place.id.clone(),
                name: place.name.clone(),
                day_index,
                accepts,
                rejects,
                pending: members.len() - accepts - rejects,
            });
        }
    }
    summaries
}

/// True once `votes` covers every place of a non-empty itinerary
pub fn all_places_voted(itinerary: &ItineraryDocument, votes: &BTreeMap<String, PlaceVote>) -> bool {
    let place_ids = itinerary.place_ids();
    !place_ids.is_empty() && place_ids.iter().all(|id| votes.contains_key(*id))
}
