//! Booking search deep links
//!
//! Builds the flight-search URL stored on a group once its travel dates are
//! determined. Parameter order is fixed, so identical input always yields a
//! byte-identical URL.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CabinClass, TravelDates};
use crate::services::iata::resolve_country;

const BOOKING_BASE_URL: &str = "https://flights.booking.com/flights";
const TRIP_TYPE: &str = "ROUNDTRIP";

/// Call-contract violations; content is never rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingUrlError {
    #[error("'{0}' is not a three-letter IATA code")]
    InvalidIata(String),

    #[error("at least one adult traveller is required")]
    NoAdults,

    #[error("return date {return_date} is before departure date {depart_date}")]
    ReturnBeforeDeparture {
        depart_date: NaiveDate,
        return_date: NaiveDate,
    },
}

/// Build the round-trip search URL for the given trip
pub fn build_booking_url(
    departure_iata: &str,
    destination_iata: &str,
    depart_date: NaiveDate,
    return_date: NaiveDate,
    adult_count: u32,
    cabin_class: CabinClass,
) -> Result<String, BookingUrlError> {
    let from = normalize_iata(departure_iata)?;
    let to = normalize_iata(destination_iata)?;

    if adult_count == 0 {
        return Err(BookingUrlError::NoAdults);
    }
    if return_date < depart_date {
        return Err(BookingUrlError::ReturnBeforeDeparture {
            depart_date,
            return_date,
        });
    }

    Ok(format!(
        "{base}/{from}.AIRPORT-{to}.AIRPORT/?type={trip}&adults={adults}&cabinClass={cabin}\
         &children=&from={from}.AIRPORT&to={to}.AIRPORT&fromCountry={from_cc}&toCountry={to_cc}\
         &depart={depart}&return={ret}&sort=BEST&travelPurpose=leisure",
        base = BOOKING_BASE_URL,
        from = from,
        to = to,
        trip = TRIP_TYPE,
        adults = adult_count,
        cabin = cabin_class.as_str(),
        from_cc = resolve_country(&from),
        to_cc = resolve_country(&to),
        depart = depart_date.format("%Y-%m-%d"),
        ret = return_date.format("%Y-%m-%d"),
    ))
}

/// [`build_booking_url`] over a [`TravelDates`] record
pub fn booking_url_for(dates: &TravelDates) -> Result<String, BookingUrlError> {
    build_booking_url(
        &dates.departure_iata,
        &dates.destination_iata,
        dates.departure_date,
        dates.return_date,
        dates.adult_count,
        dates.cabin_class,
    )
}

fn normalize_iata(code: &str) -> Result<String, BookingUrlError> {
    let trimmed = code.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(BookingUrlError::InvalidIata(code.to_string()))
    }
}
