//! Group member model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Free-text travel preferences collected from a member
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberPreferences {
    pub interests: Option<String>,
    pub budget: Option<String>,
    pub schedule: Option<String>,
    pub travel_style: Option<String>,
    pub dietary: Option<String>,
    pub accessibility: Option<String>,
    pub notes: Option<String>,
}

impl MemberPreferences {
    /// Labelled non-empty fields, in a fixed order
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("Interests", &self.interests),
            ("Budget", &self.budget),
            ("Schedule", &self.schedule),
            ("Travel style", &self.travel_style),
            ("Dietary needs", &self.dietary),
            ("Accessibility", &self.accessibility),
            ("Notes", &self.notes),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (label, v))
        })
        .collect()
    }
}

/// Accept/reject verdict on a single place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceVote {
    Accept,
    Reject,
}

/// One member of one travel group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: String,
    pub display_name: Option<String>,
    pub preferences: MemberPreferences,
    pub regenerate_vote: bool,
    pub itinerary_feedback: Option<String>,
    pub selected_hotel: Option<String>,
    /// Place id → verdict
    pub place_votes: BTreeMap<String, PlaceVote>,
    pub all_places_voted: bool,
    pub joined_at: DateTime<Utc>,
}

impl GroupMember {
    /// Fresh member with no votes cast
    pub fn new(
        group_id: Uuid,
        user_id: impl Into<String>,
        display_name: Option<String>,
        preferences: MemberPreferences,
    ) -> Self {
        Self {
            group_id,
            user_id: user_id.into(),
            display_name,
            preferences,
            regenerate_vote: false,
            itinerary_feedback: None,
            selected_hotel: None,
            place_votes: BTreeMap::new(),
            all_places_voted: false,
            joined_at: Utc::now(),
        }
    }

    /// Name used in prompts and summaries
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_entries_skip_blank_fields() {
        let prefs = MemberPreferences {
            interests: Some("monasteries, trekking".to_string()),
            budget: Some("   ".to_string()),
            dietary: Some("vegetarian".to_string()),
            ..Default::default()
        };

        assert_eq!(
            prefs.entries(),
            vec![("Interests", "monasteries, trekking"), ("Dietary needs", "vegetarian")]
        );
    }

    #[test]
    fn test_place_vote_wire_format() {
        let votes = BTreeMap::from([("p1".to_string(), PlaceVote::Reject)]);
        assert_eq!(serde_json::to_string(&votes).unwrap(), r#"{"p1":"reject"}"#);
    }
}
