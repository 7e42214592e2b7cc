//! Reservation ledger and identifier generation.

use rand::RngCore;

use crate::{
    error::BookingError,
    models::{now_to_second, Flight, Reservation, ReservationStatus},
};

/// Prefix shared by every generated reservation identifier.
pub const RESERVATION_ID_PREFIX: &str = "RES-";

/// Random bytes per identifier; rendered as twice as many hex digits.
const RESERVATION_ID_BYTES: usize = 6;

/// Authoritative, insertion-ordered collection of reservations.
#[derive(Debug, Clone, Default)]
pub struct ReservationLedger {
    reservations: Vec<Reservation>,
}

impl ReservationLedger {
    /// Build a ledger from existing reservations in the order given.
    pub fn new(reservations: Vec<Reservation>) -> Self {
        Self { reservations }
    }

    /// Record a new confirmed reservation for `flight`.
    ///
    /// The name is trimmed; an empty result is rejected with
    /// [`BookingError::Validation`]. Seat counts are not touched here.
    pub fn create(
        &mut self,
        passenger_name: &str,
        flight: &Flight,
    ) -> Result<Reservation, BookingError> {
        let passenger_name = passenger_name.trim();
        if passenger_name.is_empty() {
            return Err(BookingError::Validation(
                "passenger name cannot be empty".to_string(),
            ));
        }

        let reservation = Reservation::restore(
            self.unused_id(),
            passenger_name,
            flight.flight_number,
            now_to_second(),
            ReservationStatus::Confirmed,
        );
        self.reservations.push(reservation.clone());
        Ok(reservation)
    }

    /// Confirmed reservation whose id matches case-insensitively.
    pub fn find_by_id(&self, reservation_id: &str) -> Option<&Reservation> {
        let needle = reservation_id.trim();
        self.reservations.iter().find(|reservation| {
            reservation.is_active() && reservation.reservation_id().eq_ignore_ascii_case(needle)
        })
    }

    /// First confirmed reservation for this passenger, case-insensitive.
    pub fn find_active_by_passenger_name(&self, name: &str) -> Option<&Reservation> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.reservations.iter().find(|reservation| {
            reservation.is_active() && reservation.passenger_name().to_lowercase() == needle
        })
    }

    /// Move a confirmed reservation to cancelled and return the updated record.
    pub fn cancel(&mut self, reservation_id: &str) -> Result<Reservation, BookingError> {
        let needle = reservation_id.trim();
        let reservation = self
            .position_any(needle)
            .and_then(|index| self.reservations.get_mut(index))
            .ok_or_else(|| BookingError::ReservationNotFound(needle.to_string()))?;

        if reservation.status() != ReservationStatus::Confirmed {
            return Err(BookingError::InvalidState {
                id: reservation.reservation_id().to_string(),
                reason: format!("status is {}", reservation.status()),
            });
        }

        reservation.set_status(ReservationStatus::Cancelled);
        Ok(reservation.clone())
    }

    /// Undo a cancellation whose seat release could not be applied.
    pub(crate) fn reinstate(&mut self, reservation_id: &str) {
        if let Some(reservation) = self
            .position_any(reservation_id)
            .and_then(|index| self.reservations.get_mut(index))
        {
            reservation.set_status(ReservationStatus::Confirmed);
        }
    }

    /// Drop a reservation created moments ago whose seat could not be taken.
    pub(crate) fn discard(&mut self, reservation_id: &str) -> Option<Reservation> {
        let index = self.position_any(reservation_id)?;
        Some(self.reservations.remove(index))
    }

    /// All reservations, cancelled ones included, in insertion order.
    pub fn list_all(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Number of records held, whatever their status.
    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Number of confirmed reservations.
    pub fn active_count(&self) -> usize {
        self.count_status(ReservationStatus::Confirmed)
    }

    /// Number of cancelled reservations.
    pub fn cancelled_count(&self) -> usize {
        self.count_status(ReservationStatus::Cancelled)
    }

    /// Confirmed reservations holding a seat on `flight_number`.
    pub fn confirmed_for_flight(&self, flight_number: u32) -> usize {
        self.reservations
            .iter()
            .filter(|reservation| {
                reservation.is_active() && reservation.flight_number() == flight_number
            })
            .count()
    }

    fn count_status(&self, status: ReservationStatus) -> usize {
        self.reservations
            .iter()
            .filter(|reservation| reservation.status() == status)
            .count()
    }

    fn position_any(&self, reservation_id: &str) -> Option<usize> {
        self.reservations
            .iter()
            .position(|reservation| reservation.reservation_id().eq_ignore_ascii_case(reservation_id))
    }

    fn unused_id(&self) -> String {
        loop {
            let candidate = generate_reservation_id();
            if self.position_any(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

/// Fresh `RES-` token with twelve upper-case hex digits from the thread-local CSPRNG.
pub fn generate_reservation_id() -> String {
    let mut bytes = [0u8; RESERVATION_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let digits: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
    format!("{RESERVATION_ID_PREFIX}{digits}")
}
