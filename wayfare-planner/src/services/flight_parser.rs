//! Flight card text parser
//!
//! Turns the text of a scraped round-trip flight card into a [`ParsedFlight`].
//! Cards concatenate their fields without separators:
//!
//! ```text
//! [banner] <waypoint> <stops> <duration> <waypoint> <waypoint> <stops> <duration> <waypoint>
//! <airlines> INR<price> View details
//! ```
//!
//! where a waypoint is `HH:MM<IATA> · <day> <Mon>`. Parsing runs in two passes:
//! [`scan`] splits the text into grammar tokens, then [`parse_flight_offer`]
//! assigns tokens to legs. The parser is total: anything it cannot resolve
//! becomes [`UNKNOWN`] (or [`PRICE_NOT_AVAILABLE`] for the price).

use tracing::{debug, warn};

use crate::models::{FlightLeg, FlightOffer, ParsedFlight, PRICE_NOT_AVAILABLE, UNKNOWN};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Ticket classes, longest first so `Economy Basic` wins over shorter matches
const TICKET_CLASSES: [&str; 4] = ["Economy Basic", "Eco Value", "Business", "First"];

const PRICE_PREFIX: &str = "INR";
const DIRECT: &str = "Direct";
const DETAILS_MARKER: &str = "view details";

/// A timestamped airport visit, e.g. `01:00MAA · 26 Jul`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waypoint {
    pub time: String,
    pub airport: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Waypoint(Waypoint),
    /// `9h 15m` or `9h`
    Duration(String),
    /// `Direct`, `1 stop`, `2 stops`
    Stops(String),
    /// Amount following `INR`, e.g. `86,414.00`
    Price(String),
    DetailsMarker,
    /// Anything outside the grammar (banner, airline names, ticket class)
    Text(String),
}

/// Parse every scraped offer, preserving input order and indices
pub fn parse_flight_options(offers: &[FlightOffer]) -> Vec<ParsedFlight> {
    offers.iter().map(parse_flight_offer).collect()
}

/// Parse a single flight card
pub fn parse_flight_offer(offer: &FlightOffer) -> ParsedFlight {
    let tokens = scan(&offer.text_content);

    let waypoint_positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| matches!(t, Token::Waypoint(_)))
        .map(|(i, _)| i)
        .collect();
    let waypoints: Vec<&Waypoint> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Waypoint(w) => Some(w),
            _ => None,
        })
        .collect();

    if waypoints.len() > 4 {
        warn!(
            index = offer.index,
            waypoints = waypoints.len(),
            "Flight card has more than four waypoints, using the first four"
        );
    } else if waypoints.len() < 4 {
        debug!(
            index = offer.index,
            waypoints = waypoints.len(),
            "Flight card has fewer than four waypoints"
        );
    }

    // Banner tokens never feed the legs or the price
    let body = match waypoint_positions.first() {
        Some(&first) => &tokens[first..],
        None => &tokens[..],
    };

    let durations: Vec<&str> = body
        .iter()
        .filter_map(|t| match t {
            Token::Duration(d) => Some(d.as_str()),
            _ => None,
        })
        .collect();
    let stops: Vec<&str> = body
        .iter()
        .filter_map(|t| match t {
            Token::Stops(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();

    let price = body.iter().find_map(|t| match t {
        Token::Price(p) => Some(p.clone()),
        _ => None,
    });

    let banner = waypoint_positions
        .first()
        .map(|&first| join_text(&tokens[..first]))
        .filter(|b| !b.is_empty());

    // Airline names sit between the final waypoint and the price
    let trailing_text = waypoint_positions
        .last()
        .map(|&last| {
            let rest = &tokens[last + 1..];
            let end = rest
                .iter()
                .position(|t| matches!(t, Token::Price(_) | Token::DetailsMarker))
                .unwrap_or(rest.len());
            join_text(&rest[..end])
        })
        .unwrap_or_default();

    let (ticket_class, airline_text) = match find_ticket_class(&trailing_text) {
        Some(class) => (Some(class.to_string()), trailing_text.replacen(class, " ", 1)),
        None => (
            banner.as_deref().and_then(find_ticket_class).map(str::to_string),
            trailing_text,
        ),
    };
    let airlines = split_airlines(&airline_text);

    let outbound_airline = airlines.first().map(String::as_str);
    let return_airline = airlines.get(1).or(airlines.first()).map(String::as_str);

    let outbound = if waypoints.len() >= 2 {
        build_leg(
            waypoints[0],
            waypoints[1],
            durations.first().copied(),
            stops.first().copied(),
            outbound_airline,
        )
    } else {
        FlightLeg::unknown()
    };

    let return_leg = if waypoints.len() >= 4 {
        build_leg(
            waypoints[2],
            waypoints[3],
            durations.get(1).copied(),
            stops.get(1).copied(),
            return_airline,
        )
    } else {
        FlightLeg::unknown()
    };

    let currency = if price.is_some() { PRICE_PREFIX } else { UNKNOWN };

    ParsedFlight {
        index: offer.index,
        banner,
        outbound,
        return_leg,
        airlines,
        price: price.unwrap_or_else(|| PRICE_NOT_AVAILABLE.to_string()),
        currency: currency.to_string(),
        ticket_class,
    }
}

fn build_leg(
    from: &Waypoint,
    to: &Waypoint,
    duration: Option<&str>,
    stops: Option<&str>,
    airline: Option<&str>,
) -> FlightLeg {
    FlightLeg {
        departure_time: from.time.clone(),
        departure_airport: from.airport.clone(),
        departure_date: from.date.clone(),
        arrival_time: to.time.clone(),
        arrival_airport: to.airport.clone(),
        arrival_date: to.date.clone(),
        duration: duration.unwrap_or(UNKNOWN).to_string(),
        stops: stops.unwrap_or(UNKNOWN).to_string(),
        airline: airline.unwrap_or(UNKNOWN).to_string(),
    }
}

fn join_text(tokens: &[Token]) -> String {
    let joined: Vec<&str> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Text(s) => Some(s.trim()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect();
    joined.join(" ")
}

fn find_ticket_class(text: &str) -> Option<&'static str> {
    TICKET_CLASSES.iter().copied().find(|class| text.contains(class))
}

/// Split airline text on commas, folding `operated by ...` into the previous entry
fn split_airlines(text: &str) -> Vec<String> {
    let mut airlines: Vec<String> = Vec::new();

    for segment in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let is_operated = segment
            .get(..8)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("operated"));

        match airlines.last_mut() {
            Some(previous) if is_operated => {
                previous.push_str(", ");
                previous.push_str(segment);
            }
            _ => airlines.push(segment.to_string()),
        }
    }

    airlines
}

// ============================================================================
// Scanner
// ============================================================================

/// Split card text into grammar tokens
///
/// Numeric productions (waypoint, duration, stop count) are only attempted at
/// the first digit of a digit run, so `Jul1 stop` scans as a date followed by
/// `1 stop`. Characters no production accepts accumulate into [`Token::Text`].
pub fn scan(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut pending = String::new();
    let mut pos = 0;

    while pos < chars.len() {
        let at_run_start =
            chars[pos].is_ascii_digit() && (pos == 0 || !chars[pos - 1].is_ascii_digit());

        let matched = if at_run_start {
            scan_waypoint(&chars, pos)
                .or_else(|| scan_duration(&chars, pos))
                .or_else(|| scan_stop_count(&chars, pos))
        } else {
            scan_price(&chars, pos)
                .or_else(|| scan_direct(&chars, pos))
                .or_else(|| scan_details_marker(&chars, pos))
        };

        match matched {
            Some((token, next)) => {
                if !pending.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut pending)));
                }
                tokens.push(token);
                pos = next;
            }
            None => {
                pending.push(chars[pos]);
                pos += 1;
            }
        }
    }

    if !pending.is_empty() {
        tokens.push(Token::Text(pending));
    }

    tokens
}

fn scan_waypoint(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let (hour, p) = take_digits(chars, start, 2, 2)?;
    if chars.get(p) != Some(&':') {
        return None;
    }
    let (minute, p) = take_digits(chars, p + 1, 2, 2)?;
    if hour.parse::<u32>().ok()? > 23 || minute.parse::<u32>().ok()? > 59 {
        return None;
    }

    let p = skip_whitespace(chars, p);
    let airport: String = chars.get(p..p + 3)?.iter().collect();
    if !airport.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }

    let p = skip_whitespace(chars, p + 3);
    if chars.get(p) != Some(&'·') {
        return None;
    }
    let p = skip_whitespace(chars, p + 1);

    let (day, p) = take_digits(chars, p, 1, 2)?;
    let day_number: u32 = day.parse().ok()?;
    if !(1..=31).contains(&day_number) {
        return None;
    }

    let p = skip_whitespace(chars, p);
    let month: String = chars.get(p..p + 3)?.iter().collect();
    if !MONTHS.contains(&month.as_str()) {
        return None;
    }

    let waypoint = Waypoint {
        time: format!("{}:{}", hour, minute),
        airport,
        date: format!("{} {}", day, month),
    };
    Some((Token::Waypoint(waypoint), p + 3))
}

fn scan_duration(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let (hours, p) = take_digits(chars, start, 1, 3)?;
    if chars.get(p) != Some(&'h') {
        return None;
    }
    let mut end = p + 1;
    let mut label = format!("{}h", hours);

    let q = skip_whitespace(chars, end);
    if let Some((minutes, r)) = take_digits(chars, q, 1, 2) {
        if chars.get(r) == Some(&'m') {
            label = format!("{}h {}m", hours, minutes);
            end = r + 1;
        }
    }

    Some((Token::Duration(label), end))
}

fn scan_stop_count(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let (count, p) = take_digits(chars, start, 1, 2)?;
    let p = skip_whitespace(chars, p);
    if !starts_with(chars, p, "stop") {
        return None;
    }
    let mut end = p + 4;
    if chars.get(end) == Some(&'s') {
        end += 1;
    }

    let label = if count == "1" {
        "1 stop".to_string()
    } else {
        format!("{} stops", count)
    };
    Some((Token::Stops(label), end))
}

fn scan_price(chars: &[char], start: usize) -> Option<(Token, usize)> {
    if !starts_with(chars, start, PRICE_PREFIX) {
        return None;
    }
    let p = skip_whitespace(chars, start + PRICE_PREFIX.len());
    if !chars.get(p)?.is_ascii_digit() {
        return None;
    }

    let mut end = p;
    while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == ',' || chars[end] == '.') {
        end += 1;
    }
    // A trailing separator belongs to the surrounding prose, not the amount
    while end > p && matches!(chars[end - 1], ',' | '.') {
        end -= 1;
    }

    let amount: String = chars[p..end].iter().collect();
    Some((Token::Price(amount), end))
}

fn scan_direct(chars: &[char], start: usize) -> Option<(Token, usize)> {
    starts_with(chars, start, DIRECT)
        .then(|| (Token::Stops(DIRECT.to_string()), start + DIRECT.len()))
}

fn scan_details_marker(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let candidate = chars.get(start..start + DETAILS_MARKER.len())?;
    let matches = candidate
        .iter()
        .zip(DETAILS_MARKER.chars())
        .all(|(c, m)| c.to_ascii_lowercase() == m);
    matches.then(|| (Token::DetailsMarker, start + DETAILS_MARKER.len()))
}

/// Read between `min` and `max` ASCII digits starting at `start`
fn take_digits(chars: &[char], start: usize, min: usize, max: usize) -> Option<(String, usize)> {
    let mut end = start;
    while end < chars.len() && end - start < max && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end - start < min {
        return None;
    }
    Some((chars[start..end].iter().collect(), end))
}

/// Skip any Unicode whitespace (scraped cards use NBSP around `·`)
fn skip_whitespace(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

fn starts_with(chars: &[char], start: usize, literal: &str) -> bool {
    let mut pos = start;
    for expected in literal.chars() {
        if chars.get(pos) != Some(&expected) {
            return false;
        }
        pos += 1;
    }
    true
}
