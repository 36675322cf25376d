//! Prompt construction for itinerary generation
//!
//! Member preferences are folded into one request. Regeneration prompts carry
//! the same preferences plus the feedback collected from the members who voted.

use std::fmt::Write;

use crate::models::{GroupMember, TravelGroup};

const RESPONSE_SHAPE: &str = r#"Respond with one JSON object of this shape:
{
  "days": [
    {
      "date": "26", "day": "Saturday", "month": "July",
      "places": [
        {
          "name": "...", "description": "...", "duration": "2 hours",
          "type": "monument|museum|park|food|shopping|photo_spot|historical|entertainment|cultural|nature",
          "visitTime": "09:00 AM"
        }
      ]
    }
  ],
  "hotels": [
    { "name": "...", "rating": 4.5, "price": "INR 4,500", "amenities": ["..."] }
  ],
  "flights": [
    { "airline": "...", "departure": "...", "arrival": "...", "duration": "...", "price": "..." }
  ],
  "budgetRange": "..."
}
List places of each day in visiting order. Suggest 3 to 5 hotels."#;

/// Prompt for the first itinerary of a group
pub fn generation_prompt(group: &TravelGroup, members: &[GroupMember]) -> String {
    let mut prompt = trip_header(group);
    push_preferences(&mut prompt, members);
    prompt.push('\n');
    prompt.push_str(RESPONSE_SHAPE);
    prompt
}

/// Prompt for a regenerated itinerary
///
/// `feedback` pairs a member label with what that member wants changed.
/// `previous_places` lists the places of the itinerary being replaced.
pub fn regeneration_prompt(
    group: &TravelGroup,
    members: &[GroupMember],
    feedback: &[(String, String)],
    previous_places: &[&str],
) -> String {
    let mut prompt = trip_header(group);
    push_preferences(&mut prompt, members);

    prompt.push_str("\nThe group rejected the previous itinerary and asked for a new one.\n");
    if !previous_places.is_empty() {
        let _ = writeln!(prompt, "Previous itinerary places: {}", previous_places.join(", "));
    }
    if feedback.is_empty() {
        prompt.push_str("No specific feedback was given; propose a noticeably different plan.\n");
    } else {
        prompt.push_str("Feedback from the members who voted to regenerate:\n");
        for (member, text) in feedback {
            let _ = writeln!(prompt, "- {}: {}", member, text);
        }
        prompt.push_str("Address every point of feedback.\n");
    }

    prompt.push('\n');
    prompt.push_str(RESPONSE_SHAPE);
    prompt
}

fn trip_header(group: &TravelGroup) -> String {
    let mut header = format!(
        "Plan a {}-day group trip to {}.\n",
        group.trip_duration_days, group.destination
    );
    if let Some(dates) = &group.travel_dates {
        let _ = writeln!(
            header,
            "Travel dates: {} to {} ({} adults).",
            dates.departure_date.format("%-d %B %Y"),
            dates.return_date.format("%-d %B %Y"),
            dates.adult_count
        );
    }
    header
}

fn push_preferences(prompt: &mut String, members: &[GroupMember]) {
    let _ = writeln!(prompt, "The group has {} members.", members.len());
    for member in members {
        let entries = member.preferences.entries();
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(prompt, "{}:", member.label());
        for (label, value) in entries {
            let _ = writeln!(prompt, "  {}: {}", label, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberPreferences, TravelDates};
    use chrono::NaiveDate;

    fn group() -> TravelGroup {
        let mut group = TravelGroup::new(
            "Leh, Ladakh, India".to_string(),
            "Leh".to_string(),
            "asha".to_string(),
            4,
        );
        group.travel_dates = Some(TravelDates {
            departure_date: NaiveDate::from_ymd_opt(2025, 7, 26).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2025, 7, 30).unwrap(),
            departure_iata: "MAA".to_string(),
            destination_iata: "IXL".to_string(),
            adult_count: 2,
            cabin_class: Default::default(),
        });
        group
    }

    fn members() -> Vec<GroupMember> {
        let prefs = MemberPreferences {
            interests: Some("monasteries".to_string()),
            ..Default::default()
        };
        vec![
            GroupMember::new(uuid::Uuid::nil(), "asha", Some("Asha".to_string()), prefs),
            GroupMember::new(uuid::Uuid::nil(), "ravi", None, Default::default()),
        ]
    }

    #[test]
    fn test_generation_prompt_contents() {
        let prompt = generation_prompt(&group(), &members());
        assert!(prompt.starts_with("Plan a 4-day group trip to Leh, Ladakh, India."));
        assert!(prompt.contains("Travel dates: 26 July 2025 to 30 July 2025 (2 adults)."));
        assert!(prompt.contains("Asha:\n  Interests: monasteries"));
        assert!(!prompt.contains("ravi:"));
        assert!(prompt.contains("\"budgetRange\""));
    }

    #[test]
    fn test_regeneration_prompt_includes_feedback() {
        let feedback = vec![("Asha".to_string(), "less driving".to_string())];
        let prompt = regeneration_prompt(&group(), &members(), &feedback, &["Leh Palace"]);

        assert!(prompt.contains("Interests: monasteries"));
        assert!(prompt.contains("Previous itinerary places: Leh Palace"));
        assert!(prompt.contains("- Asha: less driving"));
    }

    #[test]
    fn test_regeneration_prompt_without_feedback() {
        let prompt = regeneration_prompt(&group(), &members(), &[], &[]);
        assert!(prompt.contains("No specific feedback was given"));
        assert!(!prompt.contains("Previous itinerary places"));
    }
}
