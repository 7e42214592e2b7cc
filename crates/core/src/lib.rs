#![warn(clippy::all, missing_docs)]

//! Core domain logic for the airline reservation system.
//!
//! This crate hosts the flight and reservation models, the inventory and
//! ledger that own them, the booking service that keeps both consistent,
//! configuration handling, and the record-file persistence layer used by the
//! console front-end and any future frontends.

pub mod booking;
pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod models;
pub mod store;

pub use booking::{BookingEvent, BookingService, BookingSummary};
pub use config::AppConfig;
pub use error::{BookingError, PersistenceError};
pub use inventory::FlightInventory;
pub use ledger::ReservationLedger;
pub use models::{Flight, Reservation, ReservationStatus, SeatChange};
pub use store::DataStore;
