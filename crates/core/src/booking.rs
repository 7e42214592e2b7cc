//! Booking orchestration over the flight inventory and reservation ledger.
//!
//! Every mutation runs under one write lock so the seat check, the ledger
//! change, and the seat adjustment are observed together or not at all.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    error::{BookingError, PersistenceError},
    inventory::FlightInventory,
    ledger::ReservationLedger,
    models::{Flight, Reservation, SeatChange},
    store::DataStore,
};

/// Emitted after a booking or cancellation has been applied.
#[derive(Debug, Clone, Serialize)]
pub enum BookingEvent {
    /// A seat was booked.
    Booked {
        /// The new confirmed reservation.
        reservation: Reservation,
        /// Flight state right after the seat was taken.
        flight: Flight,
    },
    /// A reservation was cancelled and its seat released.
    Cancelled {
        /// The reservation, now cancelled.
        reservation: Reservation,
        /// Flight state right after the seat was released.
        flight: Flight,
        /// Caller-supplied cancellation reason.
        reason: String,
    },
}

/// Aggregate counts for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    /// Flights in the inventory.
    pub flights: usize,
    /// Reservation records of any status.
    pub reservations: usize,
    /// Confirmed reservations.
    pub active: usize,
    /// Cancelled reservations.
    pub cancelled: usize,
    /// Seats still available across all flights.
    pub available_seats: u64,
}

struct Inner {
    inventory: FlightInventory,
    ledger: ReservationLedger,
}

/// Thread-safe handle coordinating bookings and cancellations.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct BookingService {
    inner: Arc<RwLock<Inner>>,
    events: Option<mpsc::UnboundedSender<BookingEvent>>,
    store: Option<DataStore>,
    persist_on_change: bool,
}

impl BookingService {
    /// Take ownership of an inventory and ledger.
    pub fn new(inventory: FlightInventory, ledger: ReservationLedger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner { inventory, ledger })),
            events: None,
            store: None,
            persist_on_change: false,
        }
    }

    /// Build a service from the store's record files and keep the store for saving.
    pub fn load(store: DataStore, persist_on_change: bool) -> Self {
        let (inventory, ledger) = store.load();
        Self::new(inventory, ledger).with_store(store, persist_on_change)
    }

    /// Attach a store; with `persist_on_change` every successful mutation is written.
    pub fn with_store(mut self, store: DataStore, persist_on_change: bool) -> Self {
        self.store = Some(store);
        self.persist_on_change = persist_on_change;
        self
    }

    /// Deliver [`BookingEvent`]s to `sender`.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<BookingEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Convenience that creates the event channel and returns its receiver.
    pub fn subscribe(self) -> (Self, mpsc::UnboundedReceiver<BookingEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (self.with_events(sender), receiver)
    }

    /// Book one seat on `flight_number` for `passenger_name`.
    pub fn book(
        &self,
        flight_number: u32,
        passenger_name: &str,
    ) -> Result<Reservation, BookingError> {
        let mut guard = self.inner.write();
        let Inner { inventory, ledger } = &mut *guard;

        let flight = inventory
            .find_by_number(flight_number)
            .ok_or(BookingError::FlightNotFound(flight_number))?;
        if !flight.has_available_seats() {
            return Err(BookingError::NoSeatsAvailable(flight_number));
        }

        let reservation = ledger.create(passenger_name, flight)?;
        if inventory.decrement_seat(flight_number) != Some(SeatChange::Applied) {
            ledger.discard(reservation.reservation_id());
            warn!(flight_number, "Seat decrement rejected; booking rolled back");
            return Err(BookingError::NoSeatsAvailable(flight_number));
        }

        let flight = inventory
            .find_by_number(flight_number)
            .cloned()
            .ok_or(BookingError::FlightNotFound(flight_number))?;
        info!(
            reservation_id = %reservation.reservation_id(),
            flight_number,
            passenger = %reservation.passenger_name(),
            available_seats = flight.available_seats(),
            "Booking confirmed"
        );

        let saved = self.persist(&guard);
        drop(guard);
        self.emit(BookingEvent::Booked {
            reservation: reservation.clone(),
            flight,
        });
        committed(reservation, saved)
    }

    /// Cancel the confirmed reservation with this id, releasing its seat.
    pub fn cancel(&self, reservation_id: &str, reason: &str) -> Result<Reservation, BookingError> {
        let mut guard = self.inner.write();
        let id = guard
            .ledger
            .find_by_id(reservation_id)
            .map(|reservation| reservation.reservation_id().to_string())
            .ok_or_else(|| BookingError::ReservationNotFound(reservation_id.trim().to_string()))?;
        self.cancel_locked(&mut guard, &id, reason)
    }

    /// Cancel the first confirmed reservation held by this passenger.
    pub fn cancel_by_passenger(
        &self,
        passenger_name: &str,
        reason: &str,
    ) -> Result<Reservation, BookingError> {
        let mut guard = self.inner.write();
        let id = guard
            .ledger
            .find_active_by_passenger_name(passenger_name)
            .map(|reservation| reservation.reservation_id().to_string())
            .ok_or_else(|| BookingError::ReservationNotFound(passenger_name.trim().to_string()))?;
        self.cancel_locked(&mut guard, &id, reason)
    }

    fn cancel_locked(
        &self,
        inner: &mut Inner,
        id: &str,
        reason: &str,
    ) -> Result<Reservation, BookingError> {
        let Inner { inventory, ledger } = &mut *inner;

        let reservation = ledger.cancel(id)?;
        let flight_number = reservation.flight_number();
        match inventory.increment_seat(flight_number) {
            Some(SeatChange::Applied) => {}
            Some(SeatChange::Clamped) => {
                ledger.reinstate(id);
                return Err(BookingError::InvalidState {
                    id: id.to_string(),
                    reason: format!("flight {flight_number} has no booked seat to release"),
                });
            }
            None => {
                ledger.reinstate(id);
                return Err(BookingError::InvalidState {
                    id: id.to_string(),
                    reason: format!("flight {flight_number} is no longer in the inventory"),
                });
            }
        }

        let flight = inventory
            .find_by_number(flight_number)
            .cloned()
            .ok_or(BookingError::FlightNotFound(flight_number))?;
        info!(
            reservation_id = %id,
            flight_number,
            reason,
            available_seats = flight.available_seats(),
            "Reservation cancelled"
        );

        let saved = self.persist(inner);
        self.emit(BookingEvent::Cancelled {
            reservation: reservation.clone(),
            flight,
            reason: reason.to_string(),
        });
        committed(reservation, saved)
    }

    /// Swap in a refreshed flight list and return reservations now left dangling.
    ///
    /// Outstanding reservations are neither cancelled nor migrated.
    pub fn replace_flights(&self, flights: Vec<Flight>) -> Vec<Reservation> {
        let mut guard = self.inner.write();
        guard.inventory.replace_all(flights);
        let dangling = dangling(&guard);
        if !dangling.is_empty() {
            warn!(
                count = dangling.len(),
                "Flight refresh left reservations without a flight"
            );
        }
        info!(flights = guard.inventory.len(), "Flight inventory replaced");
        dangling
    }

    /// Confirmed reservations whose flight is not in the inventory.
    pub fn dangling_reservations(&self) -> Vec<Reservation> {
        dangling(&self.inner.read())
    }

    /// Snapshot of every flight in insertion order.
    pub fn flights(&self) -> Vec<Flight> {
        self.inner.read().inventory.list_all().to_vec()
    }

    /// Snapshot of every reservation in insertion order.
    pub fn reservations(&self) -> Vec<Reservation> {
        self.inner.read().ledger.list_all().to_vec()
    }

    /// Flight with this number, if any.
    pub fn find_flight(&self, flight_number: u32) -> Option<Flight> {
        self.inner
            .read()
            .inventory
            .find_by_number(flight_number)
            .cloned()
    }

    /// Snapshot of bookable flights on a route for one departure date.
    pub fn search_flights(&self, origin: &str, destination: &str, date: NaiveDate) -> Vec<Flight> {
        self.inner
            .read()
            .inventory
            .search(origin, destination, date)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Confirmed reservation with this id, if any.
    pub fn find_reservation(&self, reservation_id: &str) -> Option<Reservation> {
        self.inner.read().ledger.find_by_id(reservation_id).cloned()
    }

    /// First confirmed reservation held by this passenger, if any.
    pub fn find_active_by_passenger(&self, passenger_name: &str) -> Option<Reservation> {
        self.inner
            .read()
            .ledger
            .find_active_by_passenger_name(passenger_name)
            .cloned()
    }

    /// Current aggregate counts.
    pub fn summary(&self) -> BookingSummary {
        let inner = self.inner.read();
        BookingSummary {
            flights: inner.inventory.len(),
            reservations: inner.ledger.len(),
            active: inner.ledger.active_count(),
            cancelled: inner.ledger.cancelled_count(),
            available_seats: inner.inventory.total_available_seats(),
        }
    }

    /// Write both record files through the attached store; a no-op without one.
    pub fn save(&self) -> Result<(), BookingError> {
        let Some(store) = &self.store else {
            debug!("No data store attached; skipping save");
            return Ok(());
        };
        let inner = self.inner.read();
        store.save(&inner.inventory, &inner.ledger)?;
        Ok(())
    }

    fn persist(&self, inner: &Inner) -> Result<(), PersistenceError> {
        let Some(store) = self.store.as_ref().filter(|_| self.persist_on_change) else {
            return Ok(());
        };
        store.save(&inner.inventory, &inner.ledger).map_err(|err| {
            error!("Failed to persist booking data: {err}");
            err
        })
    }

    fn emit(&self, event: BookingEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                debug!("Booking event receiver dropped");
            }
        }
    }
}

fn committed(
    reservation: Reservation,
    saved: Result<(), PersistenceError>,
) -> Result<Reservation, BookingError> {
    match saved {
        Ok(()) => Ok(reservation),
        Err(source) => Err(BookingError::Unsaved {
            reservation: Box::new(reservation),
            source,
        }),
    }
}

fn dangling(inner: &Inner) -> Vec<Reservation> {
    inner
        .ledger
        .list_all()
        .iter()
        .filter(|reservation| {
            reservation.is_active()
                && inner
                    .inventory
                    .find_by_number(reservation.flight_number())
                    .is_none()
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, thread};

    use super::*;
    use crate::models::ReservationStatus;
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn departure() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .expect("valid timestamp")
    }

    fn service_with(flights: Vec<Flight>) -> BookingService {
        BookingService::new(FlightInventory::new(flights), ReservationLedger::default())
    }

    fn seats(service: &BookingService, flight_number: u32) -> u32 {
        service
            .find_flight(flight_number)
            .map(|flight| flight.available_seats())
            .unwrap_or_default()
    }

    #[test]
    fn booking_takes_one_seat() -> Result<()> {
        let service = service_with(vec![Flight::new(123, "Mumbai", "Delhi", 150, departure(), 250.0)]);

        let reservation = service.book(123, "Asha")?;
        assert_eq!(reservation.status(), ReservationStatus::Confirmed);
        assert_eq!(reservation.passenger_name(), "Asha");
        assert_eq!(seats(&service, 123), 149);
        Ok(())
    }

    #[test]
    fn full_flight_rejects_without_mutation() {
        let mut full = Flight::new(9, "Mumbai", "Goa", 3, departure(), 90.0);
        full.set_available_seats(0);
        let service = service_with(vec![full]);

        let result = service.book(9, "Asha");
        assert!(matches!(result, Err(BookingError::NoSeatsAvailable(9))));
        assert_eq!(seats(&service, 9), 0);
        assert!(service.reservations().is_empty());
    }

    #[test]
    fn booking_errors_follow_check_order() {
        let service = service_with(vec![Flight::new(1, "A", "B", 1, departure(), 1.0)]);

        assert!(matches!(
            service.book(2, ""),
            Err(BookingError::FlightNotFound(2))
        ));
        assert!(matches!(
            service.book(1, "  "),
            Err(BookingError::Validation(_))
        ));
        assert_eq!(seats(&service, 1), 1);
        assert!(service.reservations().is_empty());
    }

    #[test]
    fn cancel_releases_exactly_one_seat() -> Result<()> {
        let service = service_with(vec![Flight::new(123, "Mumbai", "Delhi", 150, departure(), 250.0)]);
        let reservation = service.book(123, "Asha")?;

        let cancelled = service.cancel(reservation.reservation_id(), "Change of plans")?;
        assert_eq!(cancelled.status(), ReservationStatus::Cancelled);
        assert_eq!(seats(&service, 123), 150);

        let again = service.cancel(reservation.reservation_id(), "Change of plans");
        assert!(matches!(again, Err(BookingError::ReservationNotFound(_))));
        assert_eq!(seats(&service, 123), 150);

        let kept = service.reservations();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].status(), ReservationStatus::Cancelled);
        Ok(())
    }

    #[test]
    fn cancel_by_passenger_keeps_the_record() -> Result<()> {
        let service = service_with(vec![Flight::new(188, "Mumbai", "London", 2, departure(), 850.0)]);
        service.book(188, "Asha")?;
        service.book(188, "Vikram")?;

        let cancelled = service.cancel_by_passenger("ASHA", "Other")?;
        assert_eq!(cancelled.passenger_name(), "Asha");
        assert_eq!(seats(&service, 188), 1);
        assert!(service.find_active_by_passenger("asha").is_none());
        assert!(matches!(
            service.cancel_by_passenger("asha", "Other"),
            Err(BookingError::ReservationNotFound(_))
        ));

        let summary = service.summary();
        assert_eq!(summary.reservations, 2);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.available_seats, 1);
        Ok(())
    }

    #[test]
    fn dangling_reservation_cancel_is_rolled_back() -> Result<()> {
        let service = service_with(vec![Flight::new(123, "Mumbai", "Delhi", 10, departure(), 250.0)]);
        let reservation = service.book(123, "Asha")?;

        let dangling =
            service.replace_flights(vec![Flight::new(332, "Mumbai", "Bangalore", 120, departure(), 180.0)]);
        assert_eq!(dangling, vec![reservation.clone()]);
        assert_eq!(service.dangling_reservations().len(), 1);

        let result = service.cancel(reservation.reservation_id(), "Weather concerns");
        assert!(matches!(result, Err(BookingError::InvalidState { .. })));
        let still = service
            .find_reservation(reservation.reservation_id())
            .map(|found| found.status());
        assert_eq!(still, Some(ReservationStatus::Confirmed));
        Ok(())
    }

    #[test]
    fn events_describe_each_mutation() -> Result<()> {
        let (service, mut events) =
            service_with(vec![Flight::new(123, "Mumbai", "Delhi", 5, departure(), 250.0)]).subscribe();

        let reservation = service.book(123, "Asha")?;
        service.cancel(reservation.reservation_id(), "Schedule conflict")?;

        match events.try_recv()? {
            BookingEvent::Booked { reservation: booked, flight } => {
                assert_eq!(booked.reservation_id(), reservation.reservation_id());
                assert_eq!(flight.available_seats(), 4);
            }
            other => panic!("unexpected event {other:?}"),
        }
        match events.try_recv()? {
            BookingEvent::Cancelled { flight, reason, .. } => {
                assert_eq!(reason, "Schedule conflict");
                assert_eq!(flight.available_seats(), 5);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(events.try_recv().is_err());

        drop(events);
        service.book(123, "Vikram")?;
        Ok(())
    }

    #[test]
    fn last_seat_goes_to_exactly_one_caller() {
        let service = service_with(vec![Flight::new(7, "Mumbai", "Pune", 1, departure(), 50.0)]);

        let outcomes: Vec<Result<Reservation, BookingError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|index| {
                    let service = service.clone();
                    scope.spawn(move || service.book(7, &format!("Passenger {index}")))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("booking thread panicked"))
                .collect()
        });

        let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        let sold_out = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Err(BookingError::NoSeatsAvailable(7))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(sold_out, 7);
        assert_eq!(seats(&service, 7), 0);
    }

    #[test]
    fn state_survives_restart() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path());

        let service = BookingService::load(store.clone(), true);
        let reservation = service.book(123, "Asha")?;
        assert_eq!(seats(&service, 123), 149);

        let restarted = BookingService::load(store, true);
        assert_eq!(seats(&restarted, 123), 149);
        let found = restarted.find_reservation(reservation.reservation_id());
        assert_eq!(found.as_ref(), Some(&reservation));

        restarted.cancel(reservation.reservation_id(), "Personal emergency")?;
        restarted.save()?;
        let ids: HashSet<String> = restarted
            .reservations()
            .iter()
            .map(|r| r.reservation_id().to_string())
            .collect();
        assert!(ids.contains(reservation.reservation_id()));
        Ok(())
    }

    #[test]
    fn failed_save_keeps_the_booking() -> Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file")?;
        let store = DataStore::in_dir(blocker.join("data"));
        let service = service_with(vec![Flight::new(123, "Mumbai", "Delhi", 2, departure(), 250.0)])
            .with_store(store, true);

        let reservation = match service.book(123, "Asha") {
            Err(BookingError::Unsaved { reservation, .. }) => reservation,
            other => panic!("expected an unsaved booking, got {other:?}"),
        };
        assert_eq!(seats(&service, 123), 1);
        assert_eq!(service.reservations(), vec![(*reservation).clone()]);

        match service.cancel(reservation.reservation_id(), "Other") {
            Err(BookingError::Unsaved { reservation: cancelled, .. }) => {
                assert_eq!(cancelled.status(), ReservationStatus::Cancelled);
            }
            other => panic!("expected an unsaved cancellation, got {other:?}"),
        }
        assert_eq!(seats(&service, 123), 2);
        assert!(matches!(service.save(), Err(BookingError::Persistence(_))));
        Ok(())
    }

    #[test]
    fn cancel_on_flight_with_no_booked_seat_is_rolled_back() {
        let flight = Flight::new(123, "Mumbai", "Delhi", 150, departure(), 250.0);
        let stored = Reservation::restore(
            "RES-AAAA1111",
            "Asha",
            123,
            departure(),
            ReservationStatus::Confirmed,
        );
        let service = BookingService::new(
            FlightInventory::new(vec![flight]),
            ReservationLedger::new(vec![stored]),
        );

        let result = service.cancel("RES-AAAA1111", "Other");
        assert!(matches!(result, Err(BookingError::InvalidState { .. })));
        let status = service
            .find_reservation("RES-AAAA1111")
            .map(|found| found.status());
        assert_eq!(status, Some(ReservationStatus::Confirmed));
        assert_eq!(seats(&service, 123), 150);
    }

    #[test]
    fn seed_fallback_keeps_stored_bookings_cancellable() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path());
        std::fs::write(
            store.reservations_path(),
            "RES-AAAA1111,Asha,123,CONFIRMED,2026-10-14 10:00:00\n",
        )?;

        let service = BookingService::load(store, false);
        assert_eq!(seats(&service, 123), 149);

        service.cancel("RES-AAAA1111", "Other")?;
        assert_eq!(seats(&service, 123), 150);
        Ok(())
    }

    #[test]
    fn search_returns_snapshots() {
        let service = service_with(vec![
            Flight::new(123, "Mumbai", "Delhi", 150, departure(), 250.0),
            Flight::new(188, "Mumbai", "London", 200, departure(), 850.0),
        ]);
        let found = service.search_flights("mumbai", "london", departure().date());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].flight_number, 188);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Book,
        Cancel(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Book), (0usize..16).prop_map(Op::Cancel)]
    }

    proptest! {
        #[test]
        fn seats_are_conserved(ops in proptest::collection::vec(op(), 0..40)) {
            let total = 4;
            let service = service_with(vec![Flight::new(1, "A", "B", total, departure(), 10.0)]);
            let mut booked: Vec<String> = Vec::new();

            for op in ops {
                match op {
                    Op::Book => {
                        let before = seats(&service, 1);
                        match service.book(1, "Passenger") {
                            Ok(reservation) => booked.push(reservation.reservation_id().to_string()),
                            Err(BookingError::NoSeatsAvailable(_)) => prop_assert_eq!(before, 0),
                            Err(other) => prop_assert!(false, "unexpected error {other}"),
                        }
                    }
                    Op::Cancel(index) => {
                        if let Some(id) = booked.get(index % booked.len().max(1)) {
                            let _ = service.cancel(id, "Other");
                        }
                    }
                }

                let confirmed = service
                    .reservations()
                    .iter()
                    .filter(|reservation| reservation.is_active())
                    .count();
                let available = seats(&service, 1);
                prop_assert!(available <= total);
                prop_assert_eq!(available as usize + confirmed, total as usize);
            }
        }
    }
}
