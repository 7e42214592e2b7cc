//! Line codec for the flight and reservation record files.
//!
//! One record per line, comma-separated. Text fields containing a comma or a
//! double quote are wrapped in double quotes with inner quotes doubled; all
//! other fields are written bare, so files without such characters stay
//! byte-compatible with the plain comma-split format.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{
    Flight, ParseStatusError, Reservation, ReservationStatus, BOOKING_TIME_FORMAT,
    DEPARTURE_TIME_FORMAT,
};

const FLIGHT_FIELDS: usize = 7;
const RESERVATION_FIELDS: usize = 5;

/// Why a single line could not be decoded.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    /// Fewer fields than the record requires.
    #[error("expected {expected} fields, found {found}")]
    MissingFields {
        /// Required field count.
        expected: usize,
        /// Fields present on the line.
        found: usize,
    },
    /// A quoted field never closed.
    #[error("unterminated quoted field")]
    UnterminatedQuote,
    /// A numeric field did not parse or was out of range.
    #[error("invalid {field}: {value:?}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Raw text found.
        value: String,
    },
    /// A timestamp did not match its pattern.
    #[error("invalid {field} timestamp: {value:?}")]
    InvalidTimestamp {
        /// Field name.
        field: &'static str,
        /// Raw text found.
        value: String,
    },
    /// Unknown status label.
    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),
}

/// Render a text field, quoting it only when it contains a delimiter or a quote.
///
/// Line breaks are flattened to spaces since records are line-delimited.
pub fn escape_field(field: &str) -> String {
    let flattened: String = field
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .collect();
    if flattened.contains(',') || flattened.contains('"') {
        format!("\"{}\"", flattened.replace('"', "\"\""))
    } else {
        flattened
    }
}

/// Split one line into fields, honouring quoted fields.
///
/// A quote only opens a quoted field at the start of a field; elsewhere it is
/// kept literally.
pub fn split_fields(line: &str) -> Result<Vec<String>, RecordError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
                quoted = false;
            }
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err(RecordError::UnterminatedQuote);
    }
    fields.push(current);
    Ok(fields)
}

/// Encode a flight as
/// `flightNumber,origin,destination,totalSeats,availableSeats,price,departureTime`.
pub fn encode_flight(flight: &Flight) -> String {
    format!(
        "{},{},{},{},{},{:.2},{}",
        flight.flight_number,
        escape_field(&flight.origin),
        escape_field(&flight.destination),
        flight.total_seats(),
        flight.available_seats(),
        flight.price,
        flight.departure_time.format(DEPARTURE_TIME_FORMAT)
    )
}

/// Decode a flight record. Extra trailing fields are ignored.
///
/// An available count above capacity is ignored and the flight starts with
/// every seat free.
pub fn decode_flight(line: &str) -> Result<Flight, RecordError> {
    let fields = require_fields(line, FLIGHT_FIELDS)?;

    let flight_number = parse_number(&fields[0], "flight number")?;
    let total_seats = parse_number(&fields[3], "total seats")?;
    let available_seats: u32 = parse_number(&fields[4], "available seats")?;
    let price = parse_price(&fields[5])?;
    let departure_time = parse_timestamp(&fields[6], DEPARTURE_TIME_FORMAT, "departure")?;

    let mut flight = Flight::new(
        flight_number,
        fields[1].clone(),
        fields[2].clone(),
        total_seats,
        departure_time,
        price,
    );
    if !flight.set_available_seats(available_seats) {
        tracing::warn!(
            flight_number,
            available_seats,
            total_seats,
            "Available seats exceed capacity; keeping full availability"
        );
    }
    Ok(flight)
}

/// Encode a reservation as
/// `reservationId,passengerName,flightNumber,status,bookingTime`.
pub fn encode_reservation(reservation: &Reservation) -> String {
    format!(
        "{},{},{},{},{}",
        escape_field(reservation.reservation_id()),
        escape_field(reservation.passenger_name()),
        reservation.flight_number(),
        reservation.status(),
        reservation.booking_time().format(BOOKING_TIME_FORMAT)
    )
}

/// Decode a reservation record. Flight resolution is left to the caller.
pub fn decode_reservation(line: &str) -> Result<Reservation, RecordError> {
    let fields = require_fields(line, RESERVATION_FIELDS)?;

    let flight_number = parse_number(&fields[2], "flight number")?;
    let status: ReservationStatus = fields[3].parse()?;
    let booking_time = parse_timestamp(&fields[4], BOOKING_TIME_FORMAT, "booking")?;

    Ok(Reservation::restore(
        fields[0].trim(),
        fields[1].clone(),
        flight_number,
        booking_time,
        status,
    ))
}

fn require_fields(line: &str, expected: usize) -> Result<Vec<String>, RecordError> {
    let fields = split_fields(line)?;
    if fields.len() < expected {
        return Err(RecordError::MissingFields {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_number(value: &str, field: &'static str) -> Result<u32, RecordError> {
    value
        .trim()
        .parse()
        .map_err(|_| RecordError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_price(value: &str) -> Result<f64, RecordError> {
    match value.trim().parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
        _ => Err(RecordError::InvalidNumber {
            field: "price",
            value: value.to_string(),
        }),
    }
}

fn parse_timestamp(
    value: &str,
    format: &str,
    field: &'static str,
) -> Result<NaiveDateTime, RecordError> {
    NaiveDateTime::parse_from_str(value.trim(), format).map_err(|_| {
        RecordError::InvalidTimestamp {
            field,
            value: value.to_string(),
        }
    })
}
