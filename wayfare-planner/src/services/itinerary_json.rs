//! Extract the itinerary JSON object from free-form generator output
//!
//! Language models wrap the requested JSON in prose or code fences. The first
//! balanced `{...}` block starting at the first `{` is taken as the document.

use tracing::warn;
use wayfare_common::ItineraryDocument;

use crate::error::{PipelineError, PipelineResult};

pub const PARSE_FAILURE: &str = "failed to parse AI response";

/// First balanced `{...}` block of `text`
///
/// Braces inside JSON string literals (including escaped quotes) are ignored.
/// `None` when there is no `{` or the block never closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse generator output into a normalized itinerary
///
/// Missing JSON, malformed JSON and documents without days all map to
/// [`PipelineError::Generation`].
pub fn parse_itinerary_response(response: &str) -> PipelineResult<ItineraryDocument> {
    let Some(json) = extract_json_object(response) else {
        warn!(response_chars = response.len(), "No JSON object in AI response");
        return Err(PipelineError::Generation(PARSE_FAILURE.to_string()));
    };

    let mut document: ItineraryDocument = serde_json::from_str(json).map_err(|e| {
        warn!(error = %e, "AI response JSON does not match itinerary shape");
        PipelineError::Generation(PARSE_FAILURE.to_string())
    })?;

    if document.days.is_empty() {
        warn!("AI response itinerary has no days");
        return Err(PipelineError::Generation(PARSE_FAILURE.to_string()));
    }

    document.normalize();
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_with_surrounding_prose() {
        let text = "Sure! Here is your plan:\n```json\n{\"days\": [{\"places\": []}]}\n```\nEnjoy {the trip}";
        assert_eq!(extract_json_object(text), Some("{\"days\": [{\"places\": []}]}"));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"note": "use } and { freely", "quote": "say \"}\""} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"note": "use } and { freely", "quote": "say \"}\""}"#)
        );
    }

    #[test]
    fn test_extract_unbalanced_is_none() {
        assert_eq!(extract_json_object("{\"days\": ["), None);
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_parse_normalizes_document() {
        let response = r#"Here you go {"days": [{"date": "26", "day": "Sat", "month": "Jul", "places": [
            {"name": "Leh Palace", "type": "historical", "travelModes": {"walking": {"duration": "5 mins", "distance": "300 m"}}},
            {"name": "Shanti Stupa", "type": "viewpoint"}
        ]}], "hotels": [{"name": "Grand Dragon", "rating": "4.5", "price": "INR 9,000"}]}"#;

        let doc = parse_itinerary_response(response).unwrap();
        let places = &doc.days[0].places;
        assert_eq!(places[0].id, "place-1-1");
        assert_eq!(places[1].id, "place-1-2");
        assert!(places[0].travel_modes.is_none());
        assert_eq!(doc.days[0].day_name, "Sat");
        assert_eq!(doc.hotels[0].id, "hotel-1");
        assert_eq!(doc.hotels[0].rating, Some(4.5));
    }

    #[test]
    fn test_parse_failures_are_generation_errors() {
        for response in ["", "I cannot help with that.", "{\"days\": []}", "{\"days\": \"soon\"}"] {
            match parse_itinerary_response(response) {
                Err(PipelineError::Generation(msg)) => assert_eq!(msg, PARSE_FAILURE),
                other => panic!("expected generation error for {:?}, got {:?}", response, other),
            }
        }
    }
}
