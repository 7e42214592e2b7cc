use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::Serialize;

use super::BOOKING_TIME_FORMAT;

/// Lifecycle status of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Holds one seat on its flight.
    Confirmed,
    /// Terminal; the seat has been released.
    Cancelled,
    /// Not produced by any booking operation; kept so records carrying it still load.
    Pending,
}

impl ReservationStatus {
    /// Upper-case label used in record files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned when a status label is not one of the known variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reservation status {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for ReservationStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            "PENDING" => Ok(Self::Pending),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A passenger's claim on one seat of one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    reservation_id: String,
    passenger_name: String,
    flight_number: u32,
    booking_time: NaiveDateTime,
    status: ReservationStatus,
}

impl Reservation {
    /// Rebuild a reservation from stored fields.
    pub fn restore(
        reservation_id: impl Into<String>,
        passenger_name: impl Into<String>,
        flight_number: u32,
        booking_time: NaiveDateTime,
        status: ReservationStatus,
    ) -> Self {
        Self {
            reservation_id: reservation_id.into(),
            passenger_name: passenger_name.into(),
            flight_number,
            booking_time,
            status,
        }
    }

    /// System-generated identifier, e.g. `RES-1A2B3C4D5E6F`.
    pub fn reservation_id(&self) -> &str {
        &self.reservation_id
    }

    /// Passenger name as entered, trimmed.
    pub fn passenger_name(&self) -> &str {
        &self.passenger_name
    }

    /// Number of the flight this reservation holds a seat on.
    pub fn flight_number(&self) -> u32 {
        self.flight_number
    }

    /// Local time the booking was made.
    pub fn booking_time(&self) -> NaiveDateTime {
        self.booking_time
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Only confirmed reservations hold a seat.
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }

    pub(crate) fn set_status(&mut self, status: ReservationStatus) {
        self.status = status;
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reservation {} | Passenger: {} | Flight: {} | Status: {} | Booked: {}",
            self.reservation_id,
            self.passenger_name,
            self.flight_number,
            self.status,
            self.booking_time.format(BOOKING_TIME_FORMAT)
        )
    }
}
