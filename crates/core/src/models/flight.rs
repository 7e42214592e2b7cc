use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::DEPARTURE_TIME_FORMAT;

/// Result of a single-seat adjustment under the clamp-to-capacity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatChange {
    /// The available count moved by one.
    Applied,
    /// The adjustment would have left `0..=total_seats`, so nothing changed.
    Clamped,
}

/// A scheduled departure with fixed capacity and a mutable available-seat count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flight {
    /// Flight number used as the lookup key.
    pub flight_number: u32,
    /// Departure city.
    pub origin: String,
    /// Arrival city.
    pub destination: String,
    total_seats: u32,
    available_seats: u32,
    /// Scheduled local departure time.
    pub departure_time: NaiveDateTime,
    /// Ticket price.
    pub price: f64,
}

impl Flight {
    /// Build a flight with every seat available.
    pub fn new(
        flight_number: u32,
        origin: impl Into<String>,
        destination: impl Into<String>,
        total_seats: u32,
        departure_time: NaiveDateTime,
        price: f64,
    ) -> Self {
        Self {
            flight_number,
            origin: origin.into(),
            destination: destination.into(),
            total_seats,
            available_seats: total_seats,
            departure_time,
            price,
        }
    }

    /// Seat capacity fixed at creation.
    pub fn total_seats(&self) -> u32 {
        self.total_seats
    }

    /// Seats that can still be booked.
    pub fn available_seats(&self) -> u32 {
        self.available_seats
    }

    /// Overwrite the available count. Values outside `0..=total_seats` are ignored
    /// and `false` is returned.
    pub fn set_available_seats(&mut self, available: u32) -> bool {
        if available > self.total_seats {
            return false;
        }
        self.available_seats = available;
        true
    }

    /// Take one seat; a no-op when the flight is full.
    pub fn decrease_available_seats(&mut self) -> SeatChange {
        self.clamp_to_capacity(-1)
    }

    /// Give back one seat; a no-op when every seat is already free.
    pub fn increase_available_seats(&mut self) -> SeatChange {
        self.clamp_to_capacity(1)
    }

    /// Apply `delta` only if the result stays within `0..=total_seats`.
    fn clamp_to_capacity(&mut self, delta: i64) -> SeatChange {
        let proposed = i64::from(self.available_seats) + delta;
        if proposed > i64::from(self.total_seats) {
            return SeatChange::Clamped;
        }
        match u32::try_from(proposed) {
            Ok(available) => {
                self.available_seats = available;
                SeatChange::Applied
            }
            Err(_) => SeatChange::Clamped,
        }
    }

    /// Percentage of seats taken, `0.0` for a zero-capacity flight.
    pub fn occupancy_rate(&self) -> f64 {
        if self.total_seats == 0 {
            return 0.0;
        }
        let taken = f64::from(self.total_seats - self.available_seats);
        taken / f64::from(self.total_seats) * 100.0
    }

    /// Whether no seats remain.
    pub fn is_full(&self) -> bool {
        self.available_seats == 0
    }

    /// Whether at least one seat remains.
    pub fn has_available_seats(&self) -> bool {
        self.available_seats > 0
    }
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Flight {}: {} → {} | Seats: {}/{} | Price: ${:.2} | Departure: {}",
            self.flight_number,
            self.origin,
            self.destination,
            self.available_seats,
            self.total_seats,
            self.price,
            self.departure_time.format(DEPARTURE_TIME_FORMAT)
        )
    }
}
