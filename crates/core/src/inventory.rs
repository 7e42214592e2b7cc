//! Flight inventory and seat bookkeeping.

use chrono::NaiveDate;

use crate::models::{Flight, SeatChange};

/// Authoritative, insertion-ordered collection of flights.
#[derive(Debug, Clone, Default)]
pub struct FlightInventory {
    flights: Vec<Flight>,
}

impl FlightInventory {
    /// Build an inventory from flights in the order given.
    pub fn new(flights: Vec<Flight>) -> Self {
        Self { flights }
    }

    /// First flight with this number, in insertion order.
    pub fn find_by_number(&self, flight_number: u32) -> Option<&Flight> {
        self.flights
            .iter()
            .find(|flight| flight.flight_number == flight_number)
    }

    fn find_by_number_mut(&mut self, flight_number: u32) -> Option<&mut Flight> {
        self.flights
            .iter_mut()
            .find(|flight| flight.flight_number == flight_number)
    }

    /// `false` when the flight is unknown or full.
    pub fn has_available_seats(&self, flight_number: u32) -> bool {
        self.find_by_number(flight_number)
            .map(Flight::has_available_seats)
            .unwrap_or(false)
    }

    /// Take one seat. Returns `None` when the flight is unknown; a full flight
    /// reports [`SeatChange::Clamped`] instead of an error.
    pub fn decrement_seat(&mut self, flight_number: u32) -> Option<SeatChange> {
        self.find_by_number_mut(flight_number)
            .map(Flight::decrease_available_seats)
    }

    /// Release one seat, clamped at the flight's capacity.
    pub fn increment_seat(&mut self, flight_number: u32) -> Option<SeatChange> {
        self.find_by_number_mut(flight_number)
            .map(Flight::increase_available_seats)
    }

    /// All flights in insertion order.
    pub fn list_all(&self) -> &[Flight] {
        &self.flights
    }

    /// Bookable flights on a route departing on `date`.
    ///
    /// Cities match case-insensitively after trimming; full flights are left out.
    pub fn search(&self, origin: &str, destination: &str, date: NaiveDate) -> Vec<&Flight> {
        let (origin, destination) = (origin.trim(), destination.trim());
        self.flights
            .iter()
            .filter(|flight| flight.origin.trim().eq_ignore_ascii_case(origin))
            .filter(|flight| flight.destination.trim().eq_ignore_ascii_case(destination))
            .filter(|flight| flight.departure_time.date() == date)
            .filter(|flight| flight.has_available_seats())
            .collect()
    }

    /// Number of flights held.
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Whether the inventory holds no flights.
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// Percentage of seats taken on `flight`.
    pub fn occupancy_rate(flight: &Flight) -> f64 {
        flight.occupancy_rate()
    }

    /// Sum of available seats across every flight.
    pub fn total_available_seats(&self) -> u64 {
        self.flights
            .iter()
            .map(|flight| u64::from(flight.available_seats()))
            .sum()
    }

    /// Swap in a new flight set wholesale and hand back the previous one.
    ///
    /// Reservations are not consulted; any that reference a flight missing from
    /// `flights` are left dangling.
    pub fn replace_all(&mut self, flights: Vec<Flight>) -> Vec<Flight> {
        std::mem::replace(&mut self.flights, flights)
    }
}
