//! File-backed persistence for flights and reservations.

pub mod codec;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{Duration, Local};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    error::PersistenceError,
    inventory::FlightInventory,
    ledger::ReservationLedger,
    models::{truncate_to_minute, Flight, Reservation, SeatChange},
};

/// Default flight record file name.
pub const FLIGHTS_FILE: &str = "flights.dat";
/// Default reservation record file name.
pub const RESERVATIONS_FILE: &str = "reservations.dat";

/// Reads and writes the two record files.
#[derive(Debug, Clone)]
pub struct DataStore {
    flights_path: PathBuf,
    reservations_path: PathBuf,
}

impl DataStore {
    /// Store using explicit file paths.
    pub fn new(flights_path: impl Into<PathBuf>, reservations_path: impl Into<PathBuf>) -> Self {
        Self {
            flights_path: flights_path.into(),
            reservations_path: reservations_path.into(),
        }
    }

    /// Store using the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(FLIGHTS_FILE), dir.join(RESERVATIONS_FILE))
    }

    /// Store using the paths named by the configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.flights_path(), config.reservations_path())
    }

    /// Path of the flight record file.
    pub fn flights_path(&self) -> &Path {
        &self.flights_path
    }

    /// Path of the reservation record file.
    pub fn reservations_path(&self) -> &Path {
        &self.reservations_path
    }

    /// Load both files, resolving reservations against the loaded flights.
    ///
    /// When the flights come from the seed set, each confirmed reservation on a
    /// seed flight takes one of its seats so available plus confirmed matches
    /// capacity. Reservations that no longer fit are dropped.
    pub fn load(&self) -> (FlightInventory, ReservationLedger) {
        let (flights, seeded) = self.read_flights();
        let mut reservations = self.load_reservations(&flights);
        let mut inventory = FlightInventory::new(flights);
        if seeded {
            hold_seeded_seats(&mut inventory, &mut reservations);
        }
        info!(
            flights = inventory.len(),
            reservations = reservations.len(),
            "Loaded booking data"
        );
        (inventory, ReservationLedger::new(reservations))
    }

    /// Read the flight file.
    ///
    /// A missing file means first run and yields [`seed_flights`]; an unreadable
    /// one also falls back to the seed set. Malformed lines are skipped.
    pub fn load_flights(&self) -> Vec<Flight> {
        self.read_flights().0
    }

    fn read_flights(&self) -> (Vec<Flight>, bool) {
        let content = match read_records(&self.flights_path) {
            Ok(Some(content)) => content,
            Ok(None) => {
                info!(path = %self.flights_path.display(), "No flight data yet; using seed flights");
                return (seed_flights(), true);
            }
            Err(err) => {
                warn!("{err}: {}; using seed flights", source_message(&err));
                return (seed_flights(), true);
            }
        };

        let flights: Vec<Flight> = records(&content)
            .filter_map(|(line_no, line)| match codec::decode_flight(line) {
                Ok(flight) => Some(flight),
                Err(err) => {
                    warn!(
                        path = %self.flights_path.display(),
                        line = line_no,
                        "Skipping flight record: {err}"
                    );
                    None
                }
            })
            .collect();
        (flights, false)
    }

    /// Read the reservation file, dropping records whose flight is not in `flights`.
    ///
    /// A missing or unreadable file yields no reservations.
    pub fn load_reservations(&self, flights: &[Flight]) -> Vec<Reservation> {
        let content = match read_records(&self.reservations_path) {
            Ok(Some(content)) => content,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("{err}: {}; starting without reservations", source_message(&err));
                return Vec::new();
            }
        };

        records(&content)
            .filter_map(|(line_no, line)| {
                let reservation = match codec::decode_reservation(line) {
                    Ok(reservation) => reservation,
                    Err(err) => {
                        warn!(
                            path = %self.reservations_path.display(),
                            line = line_no,
                            "Skipping reservation record: {err}"
                        );
                        return None;
                    }
                };
                let known = flights
                    .iter()
                    .any(|flight| flight.flight_number == reservation.flight_number());
                if !known {
                    warn!(
                        reservation_id = %reservation.reservation_id(),
                        flight_number = reservation.flight_number(),
                        "Dropping reservation for unknown flight"
                    );
                    return None;
                }
                Some(reservation)
            })
            .collect()
    }

    /// Write both files from the current state.
    pub fn save(
        &self,
        inventory: &FlightInventory,
        ledger: &ReservationLedger,
    ) -> Result<(), PersistenceError> {
        self.save_flights(inventory.list_all())?;
        self.save_reservations(ledger.list_all())
    }

    /// Overwrite the flight file.
    pub fn save_flights(&self, flights: &[Flight]) -> Result<(), PersistenceError> {
        let body = render(flights.iter().map(codec::encode_flight));
        write_records(&self.flights_path, &body)?;
        info!(path = %self.flights_path.display(), flights = flights.len(), "Flights saved");
        Ok(())
    }

    /// Overwrite the reservation file.
    pub fn save_reservations(&self, reservations: &[Reservation]) -> Result<(), PersistenceError> {
        let body = render(reservations.iter().map(codec::encode_reservation));
        write_records(&self.reservations_path, &body)?;
        info!(
            path = %self.reservations_path.display(),
            reservations = reservations.len(),
            "Reservations saved"
        );
        Ok(())
    }
}

/// The three flights offered on first run, departing one or two days from now.
pub fn seed_flights() -> Vec<Flight> {
    let now = truncate_to_minute(Local::now().naive_local());
    vec![
        Flight::new(123, "Mumbai", "Delhi", 150, now + Duration::days(1), 250.0),
        Flight::new(188, "Mumbai", "London", 200, now + Duration::days(2), 850.0),
        Flight::new(332, "Mumbai", "Bangalore", 120, now + Duration::days(1), 180.0),
    ]
}

fn hold_seeded_seats(inventory: &mut FlightInventory, reservations: &mut Vec<Reservation>) {
    let mut held = 0usize;
    reservations.retain(|reservation| {
        if !reservation.is_active() {
            return true;
        }
        match inventory.decrement_seat(reservation.flight_number()) {
            Some(SeatChange::Applied) => {
                held += 1;
                true
            }
            _ => {
                warn!(
                    reservation_id = %reservation.reservation_id(),
                    flight_number = reservation.flight_number(),
                    "Dropping reservation beyond seed flight capacity"
                );
                false
            }
        }
    });
    if held > 0 {
        warn!(
            reservations = held,
            "Seed flights in use; seats taken for stored confirmed reservations"
        );
    }
}

fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn render(lines: impl Iterator<Item = String>) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str(&line);
        body.push('\n');
    }
    body
}

fn read_records(path: &Path) -> Result<Option<String>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_records(path: &Path, body: &str) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PersistenceError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, body).map_err(|source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn source_message(err: &PersistenceError) -> String {
    std::error::Error::source(err)
        .map(ToString::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReservationStatus;
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn departure() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 20)
            .and_then(|date| date.and_hms_opt(14, 45, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn missing_flight_file_yields_seed_set() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path());

        let flights = store.load_flights();
        let numbers: Vec<u32> = flights.iter().map(|flight| flight.flight_number).collect();
        assert_eq!(numbers, vec![123, 188, 332]);
        assert!(flights
            .iter()
            .all(|flight| flight.available_seats() == flight.total_seats()));
        assert!(store.load_reservations(&flights).is_empty());
        Ok(())
    }

    #[test]
    fn unreadable_flight_file_falls_back_to_seed() -> Result<()> {
        let dir = tempdir()?;
        // A directory where the file should be makes the read fail.
        fs::create_dir_all(dir.path().join(FLIGHTS_FILE))?;
        let store = DataStore::in_dir(dir.path());
        assert_eq!(store.load_flights().len(), 3);
        Ok(())
    }

    #[test]
    fn save_and_load_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path().join("nested"));

        let mut inventory = FlightInventory::new(vec![
            Flight::new(123, "Mumbai", "Delhi", 150, departure(), 250.0),
            Flight::new(188, "Mumbai, BOM", "London", 200, departure(), 850.5),
        ]);
        let mut ledger = ReservationLedger::default();
        let flight = inventory.list_all()[0].clone();
        let kept = ledger.create("Asha", &flight)?;
        inventory.decrement_seat(123);
        let cancelled = ledger.create("Rao, Vikram", &flight)?;
        ledger.cancel(cancelled.reservation_id())?;

        store.save(&inventory, &ledger)?;
        let (loaded_inventory, loaded_ledger) = store.load();

        assert_eq!(loaded_inventory.list_all(), inventory.list_all());
        assert_eq!(loaded_ledger.list_all(), ledger.list_all());
        assert_eq!(
            loaded_ledger
                .find_by_id(kept.reservation_id())
                .map(Reservation::passenger_name),
            Some("Asha")
        );
        Ok(())
    }

    #[test]
    fn reservations_for_unknown_flights_are_dropped() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path());
        fs::write(
            store.flights_path(),
            "123,Mumbai,Delhi,150,149,250.00,2026-10-15 09:00\n",
        )?;
        fs::write(
            store.reservations_path(),
            "RES-AAAA1111,Asha,123,CONFIRMED,2026-10-14 10:00:00\n\
             RES-BBBB2222,Vikram,999,CONFIRMED,2026-10-14 10:01:00\n",
        )?;

        let (inventory, ledger) = store.load();
        assert_eq!(inventory.len(), 1);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.list_all()[0].reservation_id(), "RES-AAAA1111");
        assert_eq!(ledger.list_all()[0].status(), ReservationStatus::Confirmed);
        Ok(())
    }

    #[test]
    fn seed_fallback_takes_seats_for_confirmed_reservations() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path());
        fs::write(
            store.reservations_path(),
            "RES-AAAA1111,Asha,123,CONFIRMED,2026-10-14 10:00:00\n\
             RES-BBBB2222,Vikram,123,CANCELLED,2026-10-14 10:01:00\n\
             RES-CCCC3333,Meera,188,CONFIRMED,2026-10-14 10:02:00\n\
             RES-DDDD4444,Ravi,999,CONFIRMED,2026-10-14 10:03:00\n",
        )?;

        let (inventory, ledger) = store.load();
        assert_eq!(ledger.len(), 3);
        for flight in inventory.list_all() {
            let confirmed = ledger.confirmed_for_flight(flight.flight_number);
            assert_eq!(
                flight.available_seats() as usize + confirmed,
                flight.total_seats() as usize
            );
        }
        assert_eq!(
            inventory.find_by_number(123).map(Flight::available_seats),
            Some(149)
        );
        assert_eq!(
            inventory.find_by_number(332).map(Flight::available_seats),
            Some(120)
        );
        Ok(())
    }

    #[test]
    fn stored_flights_are_not_adjusted_on_load() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path());
        fs::write(
            store.flights_path(),
            "123,Mumbai,Delhi,150,149,250.00,2026-10-15 09:00\n",
        )?;
        fs::write(
            store.reservations_path(),
            "RES-AAAA1111,Asha,123,CONFIRMED,2026-10-14 10:00:00\n",
        )?;

        let (inventory, _) = store.load();
        assert_eq!(
            inventory.find_by_number(123).map(Flight::available_seats),
            Some(149)
        );
        Ok(())
    }

    #[test]
    fn malformed_and_blank_lines_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path());
        fs::write(
            store.flights_path(),
            "123,Mumbai,Delhi,150,150,250.00,2026-10-15 09:00\n\
             \n\
             broken line\n\
             188,Mumbai,London,200,10,850.00,2026-10-16 07:30\n",
        )?;

        let flights = store.load_flights();
        assert_eq!(flights.len(), 2);
        assert_eq!(flights[1].available_seats(), 10);
        Ok(())
    }

    #[test]
    fn empty_flight_file_is_not_replaced_by_seed() -> Result<()> {
        let dir = tempdir()?;
        let store = DataStore::in_dir(dir.path());
        fs::write(store.flights_path(), "")?;
        assert!(store.load_flights().is_empty());
        Ok(())
    }

    #[test]
    fn save_reports_write_failures() -> Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory")?;
        let store = DataStore::in_dir(blocker.join("data"));

        let result = store.save_flights(&seed_flights());
        assert!(matches!(result, Err(PersistenceError::Write { .. })));
        Ok(())
    }
}
