//! Error taxonomy surfaced by booking and persistence operations.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::models::Reservation;

/// Failures reported by [`BookingService`](crate::booking::BookingService) operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Bad caller input such as an empty passenger name.
    #[error("{0}")]
    Validation(String),
    /// No flight with this number exists in the inventory.
    #[error("flight {0} not found")]
    FlightNotFound(u32),
    /// No confirmed reservation matches the lookup.
    #[error("reservation {0} not found")]
    ReservationNotFound(String),
    /// The flight has no seats left.
    #[error("no seats available on flight {0}")]
    NoSeatsAvailable(u32),
    /// The reservation cannot make the requested transition.
    #[error("reservation {id} cannot be changed: {reason}")]
    InvalidState {
        /// Identifier of the reservation involved.
        id: String,
        /// What blocked the transition.
        reason: String,
    },
    /// A booking or cancellation took effect in memory but writing it to disk failed.
    ///
    /// The reservation is the committed one, so callers can report it instead
    /// of retrying.
    #[error("reservation {} was applied but not saved", .reservation.reservation_id())]
    Unsaved {
        /// Reservation as it stands after the mutation.
        reservation: Box<Reservation>,
        /// Why the save failed.
        #[source]
        source: PersistenceError,
    },
    /// Writing the record files failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// I/O failures while writing or reading the record files.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading a record file failed.
    #[error("failed to read {}", path.display())]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing a record file (or creating its directory) failed.
    #[error("failed to write {}", path.display())]
    Write {
        /// File or directory that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
